//! Key management commands.
//!
//! `elv-token keys generate` - Generate a new secp256k1 keypair.

use anyhow::Context;
use elv_core::KeyPair;
use std::fs;
use std::path::PathBuf;

/// Generate a new keypair.
pub fn generate(output: Option<PathBuf>) -> anyhow::Result<()> {
    let keypair = KeyPair::generate()?;

    if let Some(output_dir) = output {
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let private_path = output_dir.join("private.key");
        let address_path = output_dir.join("public.addr");
        keypair.save_to_files(&private_path, &address_path)?;

        println!("✔ Generated keypair:");
        println!("  Private key: {}", private_path.display());
        println!("  Address:     {}", address_path.display());
        println!();
        println!("⚠️  Keep your private key secure! Never commit it to version control.");
        println!();
        println!("Set as environment variable:");
        println!("  export ELV_PRIVATE_KEY=$(cat {})", private_path.display());
    } else {
        println!("Private key (keep secure!):");
        println!("{}", keypair.private_key_hex());
        println!();
        println!("Address:");
        println!("{}", keypair.address());
        println!();
        println!("Use --output <dir> to save keys to files.");
    }

    Ok(())
}
