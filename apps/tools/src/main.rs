use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use storage::Catalog;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "ETB")]
    currency: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Catalog(CatalogCommand),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Prints the menu, the built-in one unless `--path` is given.
    Show {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    Check {
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Catalog(CatalogCommand::Show { path }) => {
            let catalog = match path {
                Some(path) => Catalog::load(path)?,
                None => Catalog::default_menu(),
            };
            print!("{}", describe(&catalog, &cli.currency));
        }
        Command::Catalog(CatalogCommand::Check { path }) => {
            let catalog = Catalog::load(&path)?;
            let items: usize = catalog
                .categories()
                .iter()
                .map(|category| category.items.len())
                .sum();
            println!(
                "catalog ok: {} categories, {items} items",
                catalog.categories().len()
            );
        }
    }
    Ok(())
}

fn describe(catalog: &Catalog, currency: &str) -> String {
    let mut out = String::new();
    for category in catalog.categories() {
        out.push_str(&format!("{}\n", category.name));
        for (index, item) in category.items.iter().enumerate() {
            out.push_str(&format!(
                "  [{index}] {} - {currency} {}\n      {}\n",
                item.name, item.price, item.description
            ));
        }
    }
    out
}
