//! Per-event reconciliation passes.
//!
//! A pass for one event is strictly sequential. Passes for distinct boards
//! share nothing but the clients and run concurrently in bounded chunks.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::apply::ActionApplier;
use crate::board::{parse_board, BoardState};
use crate::config::Config;
use crate::error::{Result, RosterError};
use crate::models::{BoardRef, Event, MemberId};
use crate::reconcile::{reconcile, Action, ReconciliationSummary};
use crate::rsvp::RsvpSnapshot;
use crate::store::{BoardStore, EventsSource};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub template_board: String,
    pub organization: Option<String>,
    pub max_concurrent_events: usize,
    pub dry_run: bool,
    pub venue_channels: BTreeMap<String, String>,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            template_board: config.template_board.clone(),
            organization: config.trello_team.clone(),
            max_concurrent_events: config.max_concurrent_events.max(1),
            dry_run: config.dry_run,
            venue_channels: config.venue_channels.clone(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Outcome of one pass over one event.
#[derive(Debug)]
pub struct PassReport {
    pub event: Event,
    /// The board was cloned from the template during this pass
    pub board_created: bool,
    pub board: Option<BoardRef>,
    /// Actions planned (and, unless dry-run, attempted)
    pub actions: Vec<Action>,
    pub outcome: Result<ReconciliationSummary>,
}

impl PassReport {
    pub fn summary(&self) -> Option<&ReconciliationSummary> {
        self.outcome.as_ref().ok()
    }
}

/// Counts logged at the end of a cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub events: usize,
    pub failed: usize,
    pub boards_created: usize,
    pub actions: usize,
}

impl CycleStats {
    pub fn from_reports(reports: &[PassReport]) -> Self {
        Self {
            events: reports.len(),
            failed: reports.iter().filter(|r| r.outcome.is_err()).count(),
            boards_created: reports.iter().filter(|r| r.board_created).count(),
            actions: reports.iter().map(|r| r.actions.len()).sum(),
        }
    }
}

pub struct Engine<E, S> {
    events: E,
    store: S,
    settings: EngineSettings,
}

impl<E: EventsSource, S: BoardStore> Engine<E, S> {
    pub fn new(events: E, store: S, settings: EngineSettings) -> Self {
        Self {
            events,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Fetch upcoming events and run one pass per distinct event.
    ///
    /// Only a failure to list events fails the cycle. Per-event failures
    /// land in the event's own report. Events sharing a name share a board,
    /// so their passes run one after another.
    pub async fn run_cycle(&self) -> Result<Vec<PassReport>> {
        let events = self.events.upcoming_events().await?;

        let mut seen = HashSet::new();
        let events: Vec<Event> = events
            .into_iter()
            .filter(|e| {
                let fresh = seen.insert(e.id.clone());
                if !fresh {
                    debug!(event = %e.id, "Duplicate event in feed, skipping");
                }
                fresh
            })
            .collect();

        info!(count = events.len(), dry_run = self.settings.dry_run, "Starting reconciliation cycle");

        let groups = group_by_board(events);
        let mut reports = Vec::new();
        for chunk in groups.chunks(self.settings.max_concurrent_events.max(1)) {
            let futures: Vec<_> = chunk.iter().map(|group| self.run_group(group)).collect();
            for group_reports in futures::future::join_all(futures).await {
                reports.extend(group_reports);
            }
        }

        let stats = CycleStats::from_reports(&reports);
        info!(
            events = stats.events,
            failed = stats.failed,
            boards_created = stats.boards_created,
            actions = stats.actions,
            "Reconciliation cycle complete"
        );
        Ok(reports)
    }

    async fn run_group(&self, group: &[Event]) -> Vec<PassReport> {
        let mut reports = Vec::with_capacity(group.len());
        for event in group {
            reports.push(self.run_pass(event).await);
        }
        reports
    }

    pub async fn run_pass(&self, event: &Event) -> PassReport {
        let mut report = PassReport {
            event: event.clone(),
            board_created: false,
            board: None,
            actions: Vec::new(),
            outcome: Ok(ReconciliationSummary::default()),
        };

        let outcome = self.pass(event, &mut report).await;
        report.outcome = outcome;
        match &report.outcome {
            Ok(summary) => info!(
                event = %event.name,
                actions = report.actions.len(),
                failures = summary.failures.len(),
                unverified = summary.unverified.len(),
                "Pass complete"
            ),
            Err(e) => error!(event = %event.name, error = %e, "Pass aborted"),
        }
        report
    }

    async fn pass(&self, event: &Event, report: &mut PassReport) -> Result<ReconciliationSummary> {
        self.store.begin_pass(&event.name);

        let (board, created) = ActionApplier::create_board_for_event(
            &self.store,
            event,
            &self.settings.template_board,
            self.settings.organization.as_deref(),
        )
        .await?;
        report.board_created = created;
        report.board = Some(board.clone());

        let state = self.read_state(&board).await?;
        let records = self.events.rsvps(&event.id).await?;
        let snapshot = RsvpSnapshot::for_event(event, &records);
        debug!(
            event = %event.name,
            yes = snapshot.yes.len(),
            no = snapshot.no.len(),
            waitlisted = snapshot.waitlisted.len(),
            skipped = snapshot.skipped,
            "RSVP snapshot built"
        );

        let (actions, mut summary) = reconcile(&state, &snapshot);
        summary.event_name = event.name.clone();
        summary.event_waitlist_count = event.waitlist_count;
        summary.channel_hint = event
            .venue_name()
            .and_then(|venue| self.settings.venue_channels.get(venue))
            .cloned();
        report.actions = actions.clone();

        if actions.is_empty() {
            debug!(event = %event.name, "Board already matches RSVPs");
            return Ok(summary);
        }
        if self.settings.dry_run {
            for action in &actions {
                info!(event = %event.name, %action, "Dry run, not applying");
            }
            return Ok(summary);
        }

        let mut applier = ActionApplier::new(&self.store, &state);
        let failures = applier.apply(&actions).await;
        let failed: HashSet<MemberId> = failures.iter().map(|f| f.action.member()).collect();
        for failure in failures {
            summary.record_failure(failure);
        }

        summary.unverified = self.verify(&board, &snapshot, &actions, &failed).await;
        Ok(summary)
    }

    async fn read_state(&self, board: &BoardRef) -> Result<BoardState> {
        let raw = self.store.read_board(board).await?;
        Ok(parse_board(board, &raw)?)
    }

    /// Re-read the board and report members whose write went through but
    /// whose postcondition does not hold.
    async fn verify(
        &self,
        board: &BoardRef,
        snapshot: &RsvpSnapshot,
        applied: &[Action],
        failed: &HashSet<MemberId>,
    ) -> Vec<MemberId> {
        let state = match self.read_state(board).await {
            Ok(state) => state,
            Err(e) => {
                warn!(board = %board.name, error = %e, "Could not re-read board to verify");
                return Vec::new();
            }
        };

        let (pending, _) = reconcile(&state, snapshot);
        let pending: HashSet<MemberId> = pending.iter().map(Action::member).collect();
        let unverified: Vec<MemberId> = applied
            .iter()
            .map(Action::member)
            .filter(|m| pending.contains(m) && !failed.contains(m))
            .collect();

        for member in &unverified {
            warn!(board = %board.name, %member, "Write not visible on re-read");
        }
        unverified
    }
}

/// Group events by board name, keeping feed order.
fn group_by_board(events: Vec<Event>) -> Vec<Vec<Event>> {
    let mut groups: Vec<Vec<Event>> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    for event in events {
        match by_name.get(&event.name) {
            Some(&index) => {
                debug!(event = %event.id, board = %event.name, "Event shares a board with an earlier one");
                groups[index].push(event);
            }
            None => {
                by_name.insert(event.name.clone(), groups.len());
                groups.push(vec![event]);
            }
        }
    }
    groups
}
