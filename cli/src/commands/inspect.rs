use anyhow::Result;
use cropdoc::ModelArgs;
use cropdoc_core::{InferencePipeline, ModelHandle};

pub fn handle(models: &ModelArgs) -> Result<()> {
	let pipeline = InferencePipeline::load(&models.pipeline_config()?)?;

	match pipeline.gate() {
		Some(gate) => describe("Leaf gate", gate.model()),
		None => println!("Leaf gate: disabled\n"),
	}

	describe("Disease classifier", pipeline.classifier().model());
	println!(
		"Labels: {} classes",
		pipeline.classifier().taxonomy().len()
	);

	Ok(())
}

fn describe(role: &str, model: &ModelHandle) {
	let signature = model.signature();

	println!("{role}: {}", model.name());
	println!("  input:      {}", signature.input);
	println!("  output:     {}", signature.output);
	println!("  convention: {}\n", model.convention());
}
