//! Instrument command handlers.

use tabled::Tabled;

use catalog_core::{Catalog, Instrument, InstrumentDraft};

use crate::cli::{GlobalOpts, InstrumentFields, InstrumentsArgs, InstrumentsCommand};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct InstrumentRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: i64,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

fn row(i: &Instrument) -> InstrumentRow {
    InstrumentRow {
        id: i.id,
        name: i.name.clone(),
        category: i.category_id,
        owner: i.user_id.clone(),
        summary: i.summary.clone(),
    }
}

fn detail(i: &Instrument) -> String {
    output::detail(&[
        ("ID", i.id.to_string()),
        ("Name", i.name.clone()),
        ("Category", i.category_id.to_string()),
        ("Owner", i.user_id.clone()),
        ("Summary", i.summary.clone()),
        ("Description", i.description.clone()),
        ("Image", i.image_url.clone()),
    ])
}

fn id_of(i: &Instrument) -> String {
    i.id.to_string()
}

/// Build a draft from `--from-file` JSON or from flags.
fn draft_from(fields: InstrumentFields) -> Result<InstrumentDraft, CliError> {
    if let Some(path) = fields.from_file {
        let raw = std::fs::read_to_string(&path)?;
        return Ok(serde_json::from_str(&raw)?);
    }

    let name = fields.name.ok_or_else(|| missing("name"))?;
    let category_id = fields.category.ok_or_else(|| missing("category"))?;
    Ok(InstrumentDraft {
        name,
        category_id,
        summary: fields.summary,
        description: fields.description,
        image_url: fields.image_url,
    })
}

fn missing(field: &str) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: "required unless --from-file is given".into(),
    }
}

pub async fn handle(
    catalog: &Catalog,
    session: &Session,
    args: InstrumentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let command = args.command.name();
    let to_cli = |e| CliError::from_core(e, &session.profile, command);

    match args.command {
        InstrumentsCommand::List { category } => {
            let instruments = catalog.instruments(category).await.map_err(to_cli)?;
            let out =
                output::render_list(&global.output, &instruments, row, id_of)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InstrumentsCommand::Get { id } => {
            let instrument = catalog.instrument(id).await.map_err(to_cli)?;
            let out = output::render_single(&global.output, &instrument, detail, id_of)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InstrumentsCommand::Create(fields) => {
            let draft = draft_from(fields)?;
            let created = catalog.create_instrument(&draft).await.map_err(to_cli)?;
            let out = output::render_single(&global.output, &created, detail, id_of)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InstrumentsCommand::Update { id, fields } => {
            let draft = draft_from(fields)?;
            if let Some(ref user) = session.user {
                catalog.ensure_can_modify(user, id).await.map_err(to_cli)?;
            }
            let updated = catalog.update_instrument(id, &draft).await.map_err(to_cli)?;
            let out = output::render_single(&global.output, &updated, detail, id_of)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InstrumentsCommand::Delete { id } => {
            if let Some(ref user) = session.user {
                catalog.ensure_can_modify(user, id).await.map_err(to_cli)?;
            }
            catalog.delete_instrument(id).await.map_err(to_cli)?;
            if !global.quiet {
                eprintln!("Deleted instrument {id}");
            }
            Ok(())
        }
    }
}
