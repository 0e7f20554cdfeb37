use clap::Parser;
use codemodel_client_generator::{cli::Args, client, loader, output::OutputModel, Error, Result};
use std::fs;
use std::io;
use std::path::PathBuf;

pub fn validate_input_file(path: &PathBuf) -> Result<()> {
    println!("Checking input file: {path:?}");

    if !path.exists() {
        return Err(Error::from(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Input path {path:?} does not exist"),
        )));
    }

    if !path.is_file() {
        return Err(Error::from(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Input path {path:?} is not a file"),
        )));
    }

    fs::File::open(path).map(|_| {
        println!("Input file is valid and readable.");
    })?;

    Ok(())
}

pub fn create_output_dir(path: &PathBuf) -> Result<()> {
    println!("Checking output directory: {path:?}");

    if path.exists() {
        if path.is_dir() {
            println!("Output directory already exists.");
            Ok(())
        } else {
            Err(Error::from(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Path {path:?} exists but is not a directory"),
            )))
        }
    } else {
        println!("Creating directory: {path:?}");
        fs::create_dir_all(path)?;
        println!("Directory created.");
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(e) = validate_input_file(&args.input) {
        eprintln!("Failed to validate input file: {e}");
        std::process::exit(1);
    }

    if let Err(e) = create_output_dir(&args.output) {
        eprintln!("Failed to create output directory: {e}");
        std::process::exit(1);
    }

    let document = fs::read_to_string(&args.input)?;

    let registry = loader::TagRegistry::new();
    let code_model = loader::load_code_model(&registry, &document)?;

    let mut clients = Vec::with_capacity(code_model.operation_groups.len());
    for group in &code_model.operation_groups {
        clients.push(client::build_client(group)?);
    }
    let model = OutputModel { clients };

    let rendered = if args.compact {
        serde_json::to_string(&model)?
    } else {
        serde_json::to_string_pretty(&model)?
    };

    let output_path = args.output.join("model.json");
    fs::write(&output_path, rendered)?;

    println!("Output model written successfully to {output_path:?}");

    Ok(())
}
