//! Category command handlers.

use tabled::Tabled;

use catalog_core::{Catalog, Category};

use crate::cli::{CategoriesArgs, CategoriesCommand, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Slug")]
    slug: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Items")]
    items: u64,
    #[tabled(rename = "Summary")]
    summary: String,
}

fn row(c: &Category) -> CategoryRow {
    CategoryRow {
        id: c.id,
        slug: c.slug.clone(),
        name: c.name.clone(),
        items: c.item_count,
        summary: c.summary.clone(),
    }
}

fn detail(c: &Category) -> String {
    output::detail(&[
        ("ID", c.id.to_string()),
        ("Slug", c.slug.clone()),
        ("Name", c.name.clone()),
        ("Items", c.item_count.to_string()),
        ("Summary", c.summary.clone()),
        ("Description", c.description.clone()),
    ])
}

pub async fn handle(
    catalog: &Catalog,
    session: &Session,
    args: CategoriesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let command = args.command.name();
    let to_cli = |e| CliError::from_core(e, &session.profile, command);

    match args.command {
        CategoriesCommand::List => {
            // Served through the shared cache; concurrent callers share one fetch.
            let categories = catalog.categories().load().await.map_err(to_cli)?;
            let out = output::render_list(
                &global.output,
                categories.as_slice(),
                row,
                |c| c.slug.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CategoriesCommand::Get { slug } => {
            let category = catalog.category(&slug).await.map_err(to_cli)?;
            let out = output::render_single(&global.output, &category, detail, |c| {
                c.slug.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
