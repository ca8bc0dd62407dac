//! Resolve free text or a channel name to one of the upcoming events.

use std::collections::HashSet;

use crate::models::Event;

/// Words that say nothing about which event is meant
const STOP_WORDS: &[&str] = &["the", "a", "an", "of", "at", "and", "for", "in", "on"];

pub struct EventLookup<'a> {
    events: &'a [Event],
}

impl<'a> EventLookup<'a> {
    pub fn new(events: &'a [Event]) -> Self {
        Self { events }
    }

    /// Event whose name shares the most words with `query`, case-insensitive.
    /// Ties go to the earlier event. `None` when nothing overlaps.
    pub fn best_match(&self, query: &str) -> Option<&'a Event> {
        let wanted = tokens(query);
        if wanted.is_empty() {
            return None;
        }

        let mut best: Option<(&'a Event, usize)> = None;
        for event in self.events {
            let overlap = tokens(&event.name).intersection(&wanted).count();
            if overlap == 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((current, score)) => {
                    overlap > score || (overlap == score && event.time < current.time)
                }
            };
            if better {
                best = Some((event, overlap));
            }
        }
        best.map(|(event, _)| event)
    }

    /// Channel names use underscores or dashes where event names have spaces.
    pub fn for_channel(&self, channel: &str) -> Option<&'a Event> {
        let query = channel.trim_start_matches('#').replace(['_', '-'], " ");
        self.best_match(&query)
    }

    pub fn next_event(&self) -> Option<&'a Event> {
        self.events.iter().min_by_key(|e| e.time)
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}
