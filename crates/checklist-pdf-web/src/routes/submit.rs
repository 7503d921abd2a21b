//! Submit route - multipart checklist submission.

use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::Multipart;
use checklist_pdf_core::{
    Attachment, AssemblyInput, FieldDescriptor, ImageSlot, Submission, report::EmployeeInput,
    util,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::helpers::{ResultExt, RouteResult};
use crate::state::AppState;

/// Repeated employee columns posted by the browser form.
const EMPLOYEE_KEYS: [&str; 4] = [
    "employee_name",
    "employee_role",
    "employee_arrival",
    "employee_departure",
];

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    pub download_url: String,
    pub audit_url: String,
    pub page_count: usize,
    pub overflow_fields: usize,
    pub skipped_fields: Vec<String>,
}

/// Multipart parts collected before assembly.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub submission: Submission,
    pub employees: Option<Vec<EmployeeInput>>,
    pub descriptors: Vec<FieldDescriptor>,
    pub images: Vec<(ImageSlot, Vec<u8>)>,
}

impl SubmissionForm {
    /// Route one text part. JSON parts replace, plain fields accumulate.
    pub fn push_text(&mut self, name: &str, value: String) -> Result<(), String> {
        match name {
            "submission" => {
                let parsed = Submission::from_json(&value).map_err(|e| e.to_string())?;
                for (key, field) in parsed.fields {
                    self.submission.fields.insert(key, field);
                }
                if !parsed.employees.is_empty() {
                    self.employees = Some(parsed.employees);
                }
            }
            "employees" => {
                self.employees = Some(
                    serde_json::from_str(&value).map_err(|e| format!("Invalid employees: {e}"))?,
                );
            }
            "descriptors" => {
                self.descriptors =
                    serde_json::from_str(&value).map_err(|e| format!("Invalid descriptors: {e}"))?;
            }
            _ => {
                let key = name.strip_suffix("[]").unwrap_or(name);
                self.submission.push_value(key, value);
            }
        }
        Ok(())
    }

    /// Final submission, with employees from JSON or the repeated columns.
    pub fn into_parts(mut self) -> (Submission, Vec<FieldDescriptor>, Vec<(ImageSlot, Vec<u8>)>) {
        self.submission.employees = match self.employees {
            Some(employees) => employees,
            None => employees_from_columns(&self.submission),
        };
        (self.submission, self.descriptors, self.images)
    }
}

/// Zip the repeated `employee_*` columns into rows.
pub fn employees_from_columns(submission: &Submission) -> Vec<EmployeeInput> {
    let columns: Vec<Vec<String>> = EMPLOYEE_KEYS
        .iter()
        .map(|key| submission.list(key))
        .collect();
    let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
    let cell = |column: usize, row: usize| {
        columns
            .get(column)
            .and_then(|values| values.get(row))
            .cloned()
            .filter(|v| !v.trim().is_empty())
    };

    (0..rows)
        .map(|row| EmployeeInput {
            name: cell(0, row).unwrap_or_default(),
            role: cell(1, row).unwrap_or_default(),
            arrival: cell(2, row),
            departure: cell(3, row),
        })
        .filter(|input| !input.is_blank())
        .collect()
}

/// Accept a completed checklist and generate its PDF.
pub async fn submit_checklist(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> RouteResult<Json<SubmitResponse>> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        let name = field.name().unwrap_or("").to_string();
        let is_file = field.file_name().is_some();

        if let Some(slot) = ImageSlot::parse(&name).filter(|_| is_file) {
            let data = field.bytes().await.or_bad_request()?;
            if !data.is_empty() {
                form.images.push((slot, data.to_vec()));
            }
            continue;
        }
        if is_file {
            warn!("Ignoring upload for unknown slot '{}'", name);
            continue;
        }

        let value = field.text().await.or_bad_request()?;
        form.push_text(&name, value)
            .map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    }

    let (submission, descriptors, images) = form.into_parts();
    let file_stem = util::file_stem(&submission.text("site_name").unwrap_or_default());

    // Decoding and layout are CPU-bound
    let assembler = Arc::clone(&state.assembler);
    let template = Arc::clone(&state.template);
    let template_name = state.template_name.clone();
    let assembly = tokio::task::spawn_blocking(move || {
        let attachments = images
            .into_iter()
            .filter_map(|(slot, bytes)| match Attachment::decode(slot, &bytes) {
                Ok(attachment) => Some(attachment),
                Err(e) => {
                    warn!("Skipping image {}: {}", slot, e);
                    None
                }
            })
            .collect();
        assembler.assemble(&AssemblyInput {
            template: template.as_ref().clone(),
            template_name,
            submission,
            attachments,
            descriptors,
        })
    })
    .await
    .map_err(|e| {
        error!("Assembly task panicked: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Assembly failed".to_string(),
        )
    })?
    .map_err(|e| {
        error!("Failed to assemble checklist: {}", e);
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    })?;

    let id = assembly.audit.submission_id;
    let audit_json = assembly.audit.to_json_pretty().or_internal_error()?;
    tokio::fs::write(state.pdf_path(id), &assembly.pdf)
        .await
        .or_internal_error()?;
    tokio::fs::write(state.audit_path(id), audit_json)
        .await
        .or_internal_error()?;

    let response = SubmitResponse {
        id: id.to_string(),
        download_url: format!("/api/download/{id}"),
        audit_url: format!("/api/audit/{id}"),
        page_count: assembly.audit.page_count,
        overflow_fields: assembly.audit.overflow.len(),
        skipped_fields: assembly
            .audit
            .skipped_fields
            .iter()
            .map(|s| s.field.clone())
            .collect(),
    };
    info!(
        "Generated checklist {} ({} pages, {} bytes)",
        id,
        response.page_count,
        assembly.pdf.len()
    );
    state.register(id, file_stem).await;

    Ok(Json(response))
}
