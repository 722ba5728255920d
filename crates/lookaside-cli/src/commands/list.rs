use super::{json_pretty, open_manifest, EXIT_SUCCESS};
use std::path::Path;

pub fn run(manifest: &Path, json: bool) -> Result<u8, String> {
    let aside = open_manifest(manifest)?;
    if json {
        println!("{}", json_pretty(&aside.file_records)?);
    } else if aside.is_empty() {
        println!("no files tracked");
    } else {
        println!("{:<12} {:<8} {:<42} FILENAME", "SIZE", "ALG", "DIGEST");
        for r in &aside {
            println!(
                "{:<12} {:<8} {:<42} {}",
                r.size,
                r.algorithm,
                r.digest,
                r.filename.display()
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
