//! The `examscore init` command.

use std::path::Path;

use anyhow::{Context, Result};

use examscore_core::config::DEFAULT_CONFIG_FILE;

const EXAMPLE_SHEET: &str = "answers-example.csv";

pub fn execute() -> Result<()> {
    write_if_missing(Path::new(DEFAULT_CONFIG_FILE), SAMPLE_CONFIG)?;
    write_if_missing(Path::new(EXAMPLE_SHEET), EXAMPLE_ANSWERS)?;

    println!("\nNext steps:");
    println!("  1. Edit {DEFAULT_CONFIG_FILE} with your name, subject, and question types");
    println!("  2. Run: examscore validate --input {EXAMPLE_SHEET}");
    println!("  3. Run: examscore score --input {EXAMPLE_SHEET}");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examscore configuration

operator = "${USER}"
subject = "Geografi"

# Type for columns not listed under [types]:
# "PG", "Isian", "Esai", or "Belum Tersedia"
default_type = "Belum Tersedia"

# First column holds respondent names instead of answers
respondent_column = true

parallelism = 4
output_dir = "./examscore-results"
formats = ["json", "html", "xlsx"]

[types]
Q1 = "PG"
Q2 = "PG"
Q3 = "PG"
Q4 = "Isian"
Q5 = "Isian"
E1 = "Esai"
E2 = "Esai"
"#;

const EXAMPLE_ANSWERS: &str = "\
Nama,Q1,Q2,Q3,Q4,Q5,E1,E2
Kunci,A,C,B,Jakarta,Samudra Hindia,10,20
Ani,A,C,B,jakarta,Samudra Hindia,8,15
Budi,A,B,B,Bandung,samudra hindia,6,12
Citra,A,C,D, Jakarta ,Samudra Pasifik,9,absen
Dedi,B,C,B,JAKARTA,,7,18
Eka,A,A,C,Surabaya,Samudra Hindia,4,9
";
