//! Subcommands that change the reference table or the diet map.

use crate::analysis::explorer::{SpeciesPair, find_species, species_pairs};
use crate::cli::views::Context;
use crate::data::Detection;
use crate::error::Result;
use crate::output::{ResultType, emit};
use crate::writeback::{StatusUpdate, WriteBack, content_client, validate_diet, validate_status};
use serde::Serialize;

/// Look a species up among every loaded detection.
fn resolve_species(ctx: &Context, query: &str) -> Result<SpeciesPair> {
    let dataset = ctx.store.get()?;
    let rows: Vec<&Detection> = dataset.detections.iter().collect();
    let pairs = species_pairs(&rows);
    find_species(&pairs, query).cloned()
}

/// Result of a diet assignment.
#[derive(Debug, Serialize)]
pub struct ClassifyReport {
    /// Species.
    #[serde(flatten)]
    pub species: SpeciesPair,
    /// Assigned diet.
    pub diet: String,
}

/// Assign a diet category to a species.
pub fn classify(ctx: &Context, name: &str, diet: &str) -> Result<()> {
    validate_diet(diet)?;
    let species = resolve_species(ctx, name)?;

    WriteBack::new(&ctx.store, &ctx.cache, ctx.progress)
        .classify_diet(&species.scientific_name, diet)?;

    let report = ClassifyReport {
        species,
        diet: diet.to_string(),
    };
    emit(ctx.mode, ResultType::Classify, &report, |r| {
        format!(
            "{} ({}) classified as {}",
            r.species.common_name, r.species.scientific_name, r.diet
        )
    })
}

/// Arguments of a status validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidateRequest<'a> {
    /// Common or scientific name.
    pub name: &'a str,
    /// New status.
    pub status: &'a str,
    /// Optional diet change.
    pub diet: Option<&'a str>,
    /// Content API credential.
    pub token: Option<&'a str>,
    /// Skip the remote push.
    pub no_push: bool,
}

/// Set a species' status, optionally its diet, and push the reference table.
///
/// Inputs and the credential are checked before any file is touched.
pub fn validate(ctx: &Context, request: ValidateRequest<'_>) -> Result<()> {
    validate_status(request.status)?;
    if let Some(diet) = request.diet {
        validate_diet(diet)?;
    }
    let species = resolve_species(ctx, request.name)?;
    let client = if request.no_push {
        None
    } else {
        Some(content_client(
            &ctx.config.http,
            &ctx.config.remote,
            request.token,
        )?)
    };

    let update = StatusUpdate {
        scientific_name: species.scientific_name,
        common_name: species.common_name,
        status: request.status.to_string(),
        diet: request.diet.map(str::to_string),
    };
    let report = WriteBack::new(&ctx.store, &ctx.cache, ctx.progress)
        .update_status(&update, client.as_ref())?;

    emit(ctx.mode, ResultType::Validate, &report, |r| {
        let mut text = format!("{}\n", r.message);
        if let Some(diet) = &r.diet {
            text.push_str(&format!("Diet set to {diet}\n"));
        }
        text.push_str(if r.pushed {
            "Pushed to remote\n"
        } else {
            "Local files only\n"
        });
        text
    })
}
