use certview::bundle::{find_pem_certificates, read_bundle};
use certview::chain::assemble;
use certview::render::render;
use certview::types::{DigestAlgorithm, RawChain};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <bundle.pem>", args[0]);
        std::process::exit(1);
    }

    let chain = read_bundle(&args[1])?;
    println!("Bundle holds {} certificates", chain.len());
    for cert in chain.iter() {
        println!("\n{}", render(cert));
    }

    // Re-derive the order from issuer links instead of file order.
    let text = std::fs::read_to_string(&args[1])?;
    let assembled = assemble(&RawChain::new(find_pem_certificates(&text)))?;

    println!("\nAssembled order:");
    for cert in assembled.iter() {
        println!(
            "  {}  {}",
            cert.fingerprint(DigestAlgorithm::Sha256).unwrap_or("-"),
            cert.subject
        );
    }
    for warning in assembled.warnings() {
        println!("  warning: {}", warning);
    }

    Ok(())
}
