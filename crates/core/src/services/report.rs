//! Report lifecycle service.

use civicwatch_common::{AppError, AppResult, GeoPoint, IdGenerator, MediaStore};
use civicwatch_db::{
    entities::{
        report,
        report::{Category, MediaAttachment, Severity, Status},
        report_history, upvote, user,
    },
    repositories::{ReportHistoryRepository, ReportRepository, UpvoteRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::warn;
use validator::Validate;

/// Report service for business logic.
#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    history_repo: ReportHistoryRepository,
    upvote_repo: UpvoteRepository,
    media_store: Option<MediaStore>,
    id_gen: IdGenerator,
}

/// Input for creating a report. Media is uploaded by the API layer first
/// and passed down here as stored attachment references.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 4000))]
    pub description: String,

    pub category: Category,

    pub severity: Severity,

    pub latitude: f64,

    pub longitude: f64,

    #[validate(length(min = 1, max = 256))]
    pub location_name: String,

    #[serde(default)]
    pub media: Vec<MediaAttachment>,
}

/// Input for a status transition.
#[derive(Debug, Deserialize, Validate)]
pub struct TransitionInput {
    pub status: Status,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Outcome of an upvote toggle.
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    /// Whether the user's upvote now exists.
    pub upvoted: bool,
    /// The report after the toggle.
    pub report: report::Model,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub fn new(
        report_repo: ReportRepository,
        history_repo: ReportHistoryRepository,
        upvote_repo: UpvoteRepository,
    ) -> Self {
        Self {
            report_repo,
            history_repo,
            upvote_repo,
            media_store: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Attach a media store so deleted reports drop their files.
    #[must_use]
    pub fn with_media_store(mut self, store: MediaStore) -> Self {
        self.media_store = Some(store);
        self
    }

    /// Create a report.
    ///
    /// The report starts in `reported` status with an initial history row
    /// attributed to the owner, written in the same transaction.
    pub async fn create(
        &self,
        owner: &user::Model,
        input: CreateReportInput,
    ) -> AppResult<report::Model> {
        input.validate()?;

        // Length limits alone let whitespace-only values through.
        let title = require_text(&input.title, "Title")?;
        let description = require_text(&input.description, "Description")?;
        let location_name = require_text(&input.location_name, "Location name")?;

        // Coordinates get range-checked beyond what validator expresses.
        let point = GeoPoint::new(input.latitude, input.longitude)?;

        let report_id = self.id_gen.generate();
        let now = chrono::Utc::now();

        let media = serde_json::to_value(&input.media)
            .map_err(|e| AppError::Internal(format!("Failed to encode media: {e}")))?;

        let report_model = report::ActiveModel {
            id: Set(report_id.clone()),
            title: Set(title.to_string()),
            description: Set(description.to_string()),
            category: Set(input.category),
            severity: Set(input.severity),
            status: Set(Status::Reported),
            latitude: Set(point.lat),
            longitude: Set(point.lng),
            location_name: Set(location_name.to_string()),
            media: Set(media),
            user_id: Set(owner.id.clone()),
            upvote_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let history_model = report_history::ActiveModel {
            id: Set(self.id_gen.generate()),
            report_id: Set(report_id),
            status: Set(Status::Reported),
            notes: Set(None),
            updated_by: Set(owner.id.clone()),
            created_at: Set(now.into()),
        };

        self.report_repo
            .create_with_history(report_model, history_model)
            .await
    }

    /// Get a report with its full status history, oldest entry first.
    pub async fn get(
        &self,
        report_id: &str,
    ) -> AppResult<(report::Model, Vec<report_history::Model>)> {
        let report = self.report_repo.get_by_id(report_id).await?;
        let history = self.history_repo.find_by_report(report_id).await?;
        Ok((report, history))
    }

    /// Move a report to a new status, appending a history entry.
    ///
    /// Admin-only. Terminal statuses (`closed`, `rejected`) accept no
    /// further transitions. Rejection requires non-blank notes.
    pub async fn transition_status(
        &self,
        actor: &user::Model,
        report_id: &str,
        input: TransitionInput,
    ) -> AppResult<report::Model> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden(
                "Only admins can change report status".to_string(),
            ));
        }

        input.validate()?;

        let report = self.report_repo.get_by_id(report_id).await?;

        if report.status.is_terminal() {
            return Err(AppError::Validation(format!(
                "Report is {} and accepts no further status changes",
                report.status.as_str()
            )));
        }

        let notes = input
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(ToString::to_string);

        if input.status == Status::Rejected && notes.is_none() {
            return Err(AppError::Validation(
                "Rejecting a report requires notes".to_string(),
            ));
        }

        let history = report_history::ActiveModel {
            id: Set(self.id_gen.generate()),
            report_id: Set(report_id.to_string()),
            status: Set(input.status),
            notes: Set(notes),
            updated_by: Set(actor.id.clone()),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.report_repo
            .apply_transition(report_id, input.status, history)
            .await
    }

    /// Toggle a user's upvote on a report.
    ///
    /// The delete-first shape makes the toggle race-safe: the row's
    /// presence decides the branch, and the unique (user, report) index
    /// stops concurrent double-inserts.
    pub async fn toggle_upvote(
        &self,
        actor: &user::Model,
        report_id: &str,
    ) -> AppResult<ToggleOutcome> {
        // Reject unknown reports before touching the upvote table.
        self.report_repo.get_by_id(report_id).await?;

        let removed = self
            .upvote_repo
            .delete_by_user_and_report(&actor.id, report_id)
            .await?;

        let upvoted = if removed > 0 {
            self.report_repo.decrement_upvote_count(report_id).await?;
            false
        } else {
            let created = self
                .upvote_repo
                .create(upvote::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(actor.id.clone()),
                    report_id: Set(report_id.to_string()),
                    created_at: Set(chrono::Utc::now().into()),
                })
                .await;
            match created {
                Ok(_) => {
                    self.report_repo.increment_upvote_count(report_id).await?;
                }
                // A concurrent toggle inserted first; the count is theirs.
                Err(AppError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
            true
        };

        let report = self.report_repo.get_by_id(report_id).await?;
        Ok(ToggleOutcome { upvoted, report })
    }

    /// Delete a report. Only the owner or an admin may delete.
    ///
    /// Stored media is removed best-effort after the row is gone; a failed
    /// file delete logs a warning instead of failing the request.
    pub async fn delete(&self, actor: &user::Model, report_id: &str) -> AppResult<()> {
        let report = self.report_repo.get_by_id(report_id).await?;

        if report.user_id != actor.id && !actor.is_admin() {
            return Err(AppError::Forbidden(
                "Only the owner or an admin can delete a report".to_string(),
            ));
        }

        self.report_repo.delete(report_id).await?;

        if let Some(store) = &self.media_store {
            for attachment in report.attachments() {
                let Some(key) = store.key_for_url(&attachment.url) else {
                    continue;
                };
                if let Err(e) = store.delete(&key).await {
                    warn!(report_id = %report_id, key = %key, error = %e, "Failed to delete media file");
                }
            }
        }

        Ok(())
    }
}

/// Trim a required text field, rejecting blank values.
fn require_text<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be blank")));
    }
    Ok(trimmed)
}
