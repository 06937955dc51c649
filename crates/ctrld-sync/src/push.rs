use crate::api::{PolicyApi, RuleBatch};
use crate::definition::{ActionMode, ActionStatus};
use crate::reconcile::RuleIndex;

/// Maximum number of hostnames submitted in one request.
pub const BATCH_SIZE: usize = 500;

/// The folder rules are being pushed into.
#[derive(Debug, Clone, Copy)]
pub struct PushTarget<'a> {
    pub profile: &'a str,
    pub folder_name: &'a str,
    pub folder_id: &'a str,
    pub action_mode: ActionMode,
    pub action_status: ActionStatus,
}

/// Result of pushing one folder's hostnames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushOutcome {
    /// Rules the remote actually accepted.
    pub pushed: usize,
    /// Hostnames skipped because the index already held them.
    pub duplicates: usize,
    /// True only if every batch was accepted.
    pub success: bool,
}

/// Split `hostnames` into consecutive chunks of at most `size`, in order.
pub fn batches(hostnames: &[String], size: usize) -> std::slice::Chunks<'_, String> {
    hostnames.chunks(size.max(1))
}

/// Push `hostnames` into the target folder, skipping any the index already
/// holds.
///
/// A failed batch is logged and skipped; later batches are still attempted.
/// Every accepted batch is added to `index` straight away so that folders
/// pushed later in the same run treat those hostnames as duplicates.
pub async fn push_rules(
    api: &dyn PolicyApi,
    target: PushTarget<'_>,
    hostnames: &[String],
    index: &mut RuleIndex,
) -> PushOutcome {
    let PushTarget {
        profile,
        folder_name,
        ..
    } = target;

    if hostnames.is_empty() {
        tracing::info!(profile, folder = folder_name, "no rules to push");
        return PushOutcome {
            success: true,
            ..PushOutcome::default()
        };
    }

    let filtered: Vec<String> = hostnames
        .iter()
        .filter(|h| !index.contains(h))
        .cloned()
        .collect();

    let duplicates = hostnames.len() - filtered.len();
    if duplicates > 0 {
        tracing::info!(profile, folder = folder_name, duplicates, "skipping duplicate rules");
    }

    if filtered.is_empty() {
        tracing::info!(
            profile,
            folder = folder_name,
            "no new rules to push after filtering duplicates"
        );
        return PushOutcome {
            pushed: 0,
            duplicates,
            success: true,
        };
    }

    let total_batches = filtered.len().div_ceil(BATCH_SIZE);
    let mut successful_batches = 0usize;
    let mut pushed = 0usize;

    for (i, chunk) in batches(&filtered, BATCH_SIZE).enumerate() {
        let batch_number = i + 1;
        let batch = RuleBatch {
            folder_id: target.folder_id.to_owned(),
            action_mode: target.action_mode,
            action_status: target.action_status,
            hostnames: chunk.to_vec(),
        };

        if let Err(e) = api.push_rules(profile, &batch).await {
            tracing::error!(
                profile,
                folder = folder_name,
                batch = batch_number,
                error = %e,
                "failed to push batch"
            );
            continue;
        }

        tracing::info!(
            profile,
            folder = folder_name,
            batch = batch_number,
            added = chunk.len(),
            "pushed batch"
        );
        successful_batches += 1;
        pushed += chunk.len();
        index.extend(batch.hostnames);
    }

    let success = successful_batches == total_batches;
    if success {
        tracing::info!(profile, folder = folder_name, pushed, "folder finished");
    } else {
        tracing::error!(
            profile,
            folder = folder_name,
            successful_batches,
            total_batches,
            pushed,
            "only some batches succeeded"
        );
    }

    PushOutcome {
        pushed,
        duplicates,
        success,
    }
}
