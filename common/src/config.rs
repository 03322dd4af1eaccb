use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    dimension::Dimensions,
    error::{Error, Result, io_error},
    parse::{
        CONNECTION_TYPE_HEADER, MACHINE_CONFIGURATION_HEADER, READ_BUFFER_BYTES_HEADER,
        THROUGHPUT_HEADER, USE_BUFFER_HEADER, WRITE_BUFFER_BYTES_HEADER,
    },
};

/// Which columns of the input CSV are plotted and which ones group rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartConfig {
    pub x_axis: String,
    pub y_axis: String,
    pub dimensions: Vec<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            x_axis: READ_BUFFER_BYTES_HEADER.to_owned(),
            y_axis: THROUGHPUT_HEADER.to_owned(),
            dimensions: [
                MACHINE_CONFIGURATION_HEADER,
                USE_BUFFER_HEADER,
                WRITE_BUFFER_BYTES_HEADER,
                CONNECTION_TYPE_HEADER,
            ]
            .map(str::to_owned)
            .to_vec(),
        }
    }
}

impl ChartConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yml::from_str(yaml)?;
        if config.dimensions.is_empty() {
            return Err(Error::NoDimensions);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_yaml(&fs::read_to_string(path).map_err(io_error(path))?)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.dimensions.iter().cloned())
    }
}
