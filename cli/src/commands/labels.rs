use anyhow::Result;
use cropdoc::ModelArgs;
use cropdoc_core::{LabelParts, LabelTaxonomy};

/// Prints the taxonomy without loading any model.
pub fn handle(models: &ModelArgs) -> Result<()> {
	let taxonomy = models
		.pipeline_config()?
		.labels
		.as_deref()
		.map_or_else(|| Ok(LabelTaxonomy::default()), LabelTaxonomy::from_json_file)?;

	for (index, label) in taxonomy.iter().enumerate() {
		println!("{}", row(index, label));
	}

	Ok(())
}

fn row(index: usize, label: &str) -> String {
	let parts = LabelParts::parse(label);

	format!("{index:>3}  {:<26} {}", parts.crop, parts.disease)
}
