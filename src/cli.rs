use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about = "Extract Tempo worklogs into CSV tables", long_about = None)]
pub struct Cli {
    /// Data directory containing config.json plus in/ and out/ subfolders
    #[arg(short = 'd', long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn state_in_path(&self) -> PathBuf {
        self.data_dir.join("in").join("state.json")
    }

    pub fn state_out_path(&self) -> PathBuf {
        self.data_dir.join("out").join("state.json")
    }

    pub fn tables_out_dir(&self) -> PathBuf {
        self.data_dir.join("out").join("tables")
    }
}
