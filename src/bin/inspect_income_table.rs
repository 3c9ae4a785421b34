//! Utility to inspect a presumed-income lookup table and print its shape.

use dotenvy::dotenv;
use irpf_presumed_income::income_table::PresumedIncomeTable;
use std::env;
use std::path::PathBuf;

/// Main entry point for the lookup-table inspection utility.
///
/// Loads the table named by IRPF_INCOME_TABLE_PATH (or the first CLI
/// argument) and lists its year buckets, brand tokens and value buckets.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let path = env::args()
        .nth(1)
        .or_else(|| env::var("IRPF_INCOME_TABLE_PATH").ok())
        .map(PathBuf::from)
        .ok_or("pass a table path or set IRPF_INCOME_TABLE_PATH")?;

    let table = PresumedIncomeTable::from_path(&path)?;

    println!("Lookup table '{}':", path.display());
    for year in table.years() {
        let brands = table.brand_tokens(*year);
        println!("- {}: {} brand(s)", year, brands.len());

        for brand in brands {
            let buckets: Vec<String> = (0i64..=7)
                .filter(|b| table.income(*year, brand, *b).is_some())
                .map(|b| b.to_string())
                .collect();
            println!("  - {}: buckets [{}]", brand, buckets.join(", "));
        }
        println!();
    }

    Ok(())
}
