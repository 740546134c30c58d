use certview::fetch::{CaptureOptions, Target, DEFAULT_PORT};
use certview::render::{display_chain, role, OutputFormat};
use certview::review::review;
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let input = if args.len() > 1 {
        args[1].clone()
    } else {
        "google.com:443".to_string()
    };

    let target = Target::parse(&input, DEFAULT_PORT)?;

    println!("Fetching certificate chain from {}...\n", target);

    let review = review(&target, &CaptureOptions::new())?;
    println!("{}", review.rendered);

    let chain = &review.chain;
    println!("\nCertificate chain fetched successfully!");
    println!("Total certificates in chain: {}", chain.len());

    let now = chrono::Utc::now();
    for (idx, cert) in chain.iter().enumerate() {
        println!("\nCertificate {} ({}):", idx, role(chain, idx));
        println!("  Subject: {}", cert.subject);
        println!("  Server position: {}", chain.positions()[idx]);
        println!("  Status: {}", cert.validity_status(now).label());
    }

    #[cfg(feature = "json")]
    println!("\n{}", display_chain(chain, OutputFormat::Json)?);
    #[cfg(not(feature = "json"))]
    let _ = display_chain(chain, OutputFormat::Pretty)?;

    Ok(())
}
