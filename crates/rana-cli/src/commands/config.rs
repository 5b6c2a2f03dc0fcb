//! Config command implementation

use super::App;
use crate::output::OutputWriter;
use crate::output_types::ConfigRow;
use anyhow::Result;

pub fn execute(app: &App, output: &OutputWriter) -> Result<()> {
    let mut rows: Vec<ConfigRow> = app
        .config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigRow::new(key, value, source))
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));

    output.section("Configuration");
    output.table(rows)?;
    output.kv("Settings file", app.settings_path.display());
    Ok(())
}
