// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

pub mod common;
pub mod column;
pub mod dataframe;
pub mod transformation;
pub mod io;
pub use common::{ColumnMetadata, DataType, DatasetId, DatasetMetadata, Result};
pub use column::{Column, ColumnBuilder};
pub use dataframe::Dataset;
pub use transformation::{
    bucket_dates, derive_ratio, group_sum, parse_datetime_column, unpivot, DateBucket,
};
pub use io::CsvReader;

pub fn load_csv<P: AsRef<std::path::Path>>(path: P, name: &str) -> Result<Dataset> {
    CsvReader::new().read_file(path.as_ref(), name)
}
