//! Time-share proposals: schedule a new allocation

use super::{ProposalContext, ProposalKind};
use crate::error::ProposalError;
use crate::labels::{
    SCHEDULE, SCHEDULE_KEY, TIMESHARE_TYPE, TIME_SHARE, TIME_SHARE_KEY, TIME_SHARE_START_DATE_KEY,
};
use crate::time_share::TimeShare;
use chrono::{DateTime, Utc};
use docgraph_core::{ContentGroups, ContentHash, ContentItem, Document, Name, Tables, DETAILS};
use tracing::debug;

/// `timeshare` variant
///
/// Details: `title`, `time_share` (non-negative), `time_share_start_date`,
/// and an optional `schedule` naming the head of the chain to extend.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeShareProposal;

struct Terms {
    share: i64,
    start_date: DateTime<Utc>,
    schedule: Option<ContentHash>,
}

impl TimeShareProposal {
    fn terms(content: &ContentGroups) -> Result<Terms, ProposalError> {
        let share: i64 = content.get_as(DETAILS, TIME_SHARE_KEY)?;
        if share < 0 {
            return Err(ProposalError::Validation(format!(
                "time_share must not be negative, got {share}"
            )));
        }
        let start_date = content.get_as(DETAILS, TIME_SHARE_START_DATE_KEY)?;
        let schedule = content
            .get(DETAILS, SCHEDULE_KEY)
            .map(ContentItem::get_as::<ContentHash>)
            .transpose()?;
        Ok(Terms {
            share,
            start_date,
            schedule,
        })
    }

    /// Current tail of `schedule`, checked to start before `start_date`
    fn tail_before(
        tables: &Tables,
        schedule: &ContentHash,
        start_date: DateTime<Utc>,
    ) -> Result<TimeShare, ProposalError> {
        let tail = TimeShare::load(tables, schedule)?.tail(tables)?;
        if start_date <= tail.start_date() {
            return Err(ProposalError::Validation(format!(
                "start {start_date} is not after the schedule's last start {}",
                tail.start_date()
            )));
        }
        Ok(tail)
    }
}

impl ProposalKind for TimeShareProposal {
    fn proposal_type(&self) -> Name {
        TIMESHARE_TYPE
    }

    fn propose_impl(
        &self,
        _ctx: &mut ProposalContext<'_>,
        _proposer: &Name,
        content: &mut ContentGroups,
    ) -> Result<(), ProposalError> {
        Self::terms(content)?;
        Ok(())
    }

    fn post_propose_impl(
        &self,
        ctx: &mut ProposalContext<'_>,
        proposal: &Document,
    ) -> Result<(), ProposalError> {
        let terms = Self::terms(proposal.content())?;
        if let Some(schedule) = terms.schedule {
            Self::tail_before(ctx.tables(), &schedule, terms.start_date)?;
            ctx.graph()
                .write_edge(*proposal.hash(), schedule, SCHEDULE)?;
        }
        Ok(())
    }

    fn pass_impl(
        &self,
        ctx: &mut ProposalContext<'_>,
        proposal: &Document,
    ) -> Result<(), ProposalError> {
        let terms = Self::terms(proposal.content())?;
        let tail = terms
            .schedule
            .map(|schedule| Self::tail_before(ctx.tables(), &schedule, terms.start_date))
            .transpose()?;

        let mut graph = ctx.graph();
        let share = TimeShare::new(
            &mut graph,
            proposal.creator().clone(),
            terms.share,
            terms.start_date,
        )?;
        graph.write_edge(*proposal.hash(), *share.hash(), TIME_SHARE)?;
        if let Some(tail) = tail {
            tail.link_next(&mut graph, &share)?;
        }
        debug!(
            proposal = %proposal.hash().short(),
            time_share = %share.hash().short(),
            share = terms.share,
            "time share scheduled"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::{ContentGroup, GraphError, TITLE};

    fn terms_of(share: i64) -> ContentGroups {
        ContentGroups::from(vec![ContentGroup::labeled(DETAILS)
            .with(TITLE, "Stipend")
            .with(TIME_SHARE_KEY, share)
            .with(TIME_SHARE_START_DATE_KEY, DateTime::<Utc>::UNIX_EPOCH)])
    }

    #[test]
    fn negative_share_rejected() {
        assert!(matches!(
            TimeShareProposal::terms(&terms_of(-1)),
            Err(ProposalError::Validation(_))
        ));
        let terms = TimeShareProposal::terms(&terms_of(0)).unwrap();
        assert!(terms.schedule.is_none());
    }

    #[test]
    fn typed_fields_are_enforced() {
        let mut content = terms_of(5);
        content.insert_or_replace(
            DETAILS,
            ContentItem::new(TIME_SHARE_START_DATE_KEY, "tomorrow"),
        );
        assert!(matches!(
            TimeShareProposal::terms(&content),
            Err(ProposalError::Graph(GraphError::TypeMismatch { .. }))
        ));
    }
}
