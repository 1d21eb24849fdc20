//! The multi-turn booking state machine.
//!
//! A session normally passes through: idle chit-chat, service selection,
//! staff selection, price confirmation, slot selection, then inline
//! collection of name / phone / approval, and finally the ledger commit.
//! Steps without configured data (no services, no staff) are skipped. The
//! chosen-slot shortcut is checked before anything re-evaluates booking
//! intent, so digits inside a phone number are never misread as a new
//! time request.

pub mod closing;
pub mod directive;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use thiserror::Error;

use crate::booking::BookingLedger;
use crate::domain::{format_slot, BookingRequest, BusinessContext};
use crate::errors::BookingError;
use crate::extract;
use crate::schedule::SlotCandidate;
use crate::session::{ConversationState, SessionStore};

pub use closing::is_closing_reply;
pub use directive::{
    parse_booking_directive, strip_directive_lines, BookingDirective, BOOKING_MARKER,
};

const GENERIC_APOLOGY: &str =
    "Sorry, something went wrong on my end. Could you say that again?";
const GENERATOR_FALLBACK: &str = "Sorry, something went wrong. Could you try that again?";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("reply generation failed: {0}")]
pub struct ReplyError(pub String);

/// The conversational reply collaborator, used verbatim for non-booking
/// turns. Its replies may carry a booking directive line (see
/// [`directive`]).
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_reply(
        &self,
        utterance: &str,
        session_id: &str,
        business: &BusinessContext,
    ) -> Result<String, ReplyError>;
}

#[derive(Clone)]
pub struct DialogEngine {
    sessions: Arc<SessionStore>,
    ledger: BookingLedger,
    generator: Arc<dyn ReplyGenerator>,
    slot_minutes: u32,
    lookahead_days: u32,
}

impl DialogEngine {
    pub fn new(
        sessions: Arc<SessionStore>,
        ledger: BookingLedger,
        generator: Arc<dyn ReplyGenerator>,
        slot_minutes: u32,
        lookahead_days: u32,
    ) -> Self {
        Self {
            sessions,
            ledger,
            generator,
            slot_minutes: slot_minutes.clamp(5, 24 * 60),
            lookahead_days: lookahead_days.max(1),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    /// Handle one inbound utterance. Every turn produces a reply; internal
    /// failures degrade to a generic apology instead of propagating.
    pub async fn handle_turn(
        &self,
        business: &BusinessContext,
        session_id: &str,
        utterance: &str,
        now: NaiveDateTime,
    ) -> String {
        match self.try_handle_turn(business, session_id, utterance, now).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::error!(
                    event_name = "dialog.turn_failed",
                    business_id = %business.id,
                    session_id,
                    error = %error,
                    "turn handling failed, degrading to generic reply"
                );
                GENERIC_APOLOGY.to_string()
            }
        }
    }

    async fn try_handle_turn(
        &self,
        business: &BusinessContext,
        session_id: &str,
        utterance: &str,
        now: NaiveDateTime,
    ) -> Result<String, BookingError> {
        let today = now.date();
        let handle = self.sessions.session(session_id);
        let mut session = handle.lock().await;
        let state = session.begin_turn();

        // Chosen-slot shortcut: with a slot already picked and no explicit
        // date/time change in the utterance, this turn only harvests
        // contact details.
        if let Some(chosen) = state.chosen_slot {
            if !explicit_change_signal(utterance) {
                return self
                    .harvest_and_maybe_commit(business, state, session_id, utterance, chosen, now)
                    .await;
            }
            // An explicit change falls through and re-derives the slot.
        }

        if !extract::has_booking_intent(utterance, today) && !state.booking_in_progress() {
            return Ok(self.delegate_turn(business, state, session_id, utterance, now).await);
        }

        let slots = self
            .ledger
            .availability()
            .available_slots(business, self.lookahead_days, self.slot_minutes, now)
            .await?;
        let slot_set: HashSet<NaiveDateTime> =
            slots.iter().map(|candidate| candidate.start).collect();

        // A turn that answers a sub-question ("yes", "Haircut") carries no
        // date or time; recover them from the remembered original request.
        let effective = match &state.pending_request {
            Some(original)
                if extract::resolve_target_date(utterance, today).is_none()
                    && extract::extract_time(utterance).is_none() =>
            {
                original.clone()
            }
            _ => utterance.to_string(),
        };

        let resolved = extract::resolve_target_date(&effective, today);
        if let Some(resolution) = resolved {
            if resolution.is_mismatch() {
                state.booking_active = true;
                return Ok(weekday_mismatch_question(&effective, resolution.date()));
            }
        }
        let date = resolved.map(|resolution| resolution.date()).unwrap_or(today.succ_opt().unwrap_or(today));

        let time = extract::extract_time(&effective)
            .map(|time| extract::normalize_ambiguous_hour(time, &business.working_hours).0);

        // A concrete requested slot that is not in the candidate set never
        // advances the flow; offer alternatives instead.
        if let Some(time) = time {
            let exact = date.and_time(time);
            if !slot_set.contains(&exact) {
                return Ok(unavailable_slot_reply(&slots, date, exact));
            }
        }

        // Remember the first booking-intent-bearing utterance so the date
        // and time survive the service/staff/price sub-dialogues.
        if business.has_services() && state.pending_request.is_none() {
            let contributes_date = extract::resolve_target_date(utterance, today).is_some();
            let contributes_time = extract::extract_time(utterance).is_some();
            if contributes_date || contributes_time {
                state.pending_request = Some(utterance.to_string());
            }
        }

        if business.has_services() && state.service_name.is_none() {
            let services: Vec<_> = business.named_services().cloned().collect();
            if let Some(service) = extract::match_by_name(utterance, &services, |s| &s.name) {
                state.record_service(service);
            } else {
                state.booking_active = true;
                state.awaiting_service = true;
                if state.pending_request.is_none() {
                    state.pending_request = Some(utterance.to_string());
                }
                return Ok(service_prompt(business));
            }
        }

        if business.has_staff() && !state.staff_done {
            state.booking_active = true;
            state.awaiting_service = false;

            let staff: Vec<_> = business.named_staff().cloned().collect();
            if let Some(member) = extract::match_by_name(utterance, &staff, |s| &s.name) {
                state.staff_name = Some(member.name.clone());
                state.staff_done = true;
            } else if extract::says_no_preference(utterance) {
                state.staff_name = Some(String::new());
                state.staff_done = true;
            } else {
                return Ok(staff_prompt(business));
            }
        }

        if state.service_name.is_some() && !state.pricing_confirmed {
            state.booking_active = true;
            if extract::has_approval(utterance) {
                state.pricing_confirmed = true;
            } else {
                return Ok(price_prompt(state));
            }
        }

        let chosen = match time {
            Some(time) => date.and_time(time),
            None => {
                let day_slots = day_candidates(&slots, date);
                if day_slots.is_empty() {
                    return Ok(format!(
                        "No open times on {date}. Nearest available: {}. Which day works for you?",
                        suggest_top(&slots)
                    ));
                }
                state.awaiting_time = true;
                return Ok(format!(
                    "On {date} we have {}. Which time works for you?",
                    suggest_top(&day_slots)
                ));
            }
        };

        state.chosen_slot = Some(chosen);
        self.harvest_and_maybe_commit(business, state, session_id, utterance, chosen, now).await
    }

    /// Ordinary chit-chat path: hand the utterance to the reply generator
    /// unchanged, then honor a booking directive line if one came back.
    async fn delegate_turn(
        &self,
        business: &BusinessContext,
        state: &mut ConversationState,
        session_id: &str,
        utterance: &str,
        now: NaiveDateTime,
    ) -> String {
        let reply = match self.generator.generate_reply(utterance, session_id, business).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!(
                    event_name = "dialog.generator_failed",
                    business_id = %business.id,
                    session_id,
                    error = %error,
                    "reply generator failed"
                );
                return GENERATOR_FALLBACK.to_string();
            }
        };

        let Some(directive) = parse_booking_directive(&reply) else {
            return reply;
        };

        let request = BookingRequest {
            session_id: session_id.to_string(),
            start: directive.start,
            customer_name: directive.customer_name,
            customer_phone: directive.customer_phone,
            service_name: state.service_name.clone().unwrap_or_default(),
            staff_name: state.staff_name.clone().unwrap_or_default(),
            duration_minutes: state.duration_minutes.unwrap_or(30),
            price_minor: state.price_minor,
        };

        let cleaned = strip_directive_lines(&reply);
        match self.ledger.commit(business, &request, now).await {
            Ok(appointment) => {
                self.sessions.clear(session_id);
                if cleaned.is_empty() {
                    booking_confirmation(appointment.start)
                } else {
                    cleaned
                }
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "dialog.directive_commit_failed",
                    business_id = %business.id,
                    session_id,
                    error = %error,
                    "directive booking failed"
                );
                if cleaned.is_empty() {
                    format!(
                        "Unfortunately that time cannot be booked ({error}). Could you suggest another time?"
                    )
                } else {
                    cleaned
                }
            }
        }
    }

    /// Inline info collection: pick up whatever the utterance contributes,
    /// then commit the instant name, phone, and approval are all present.
    async fn harvest_and_maybe_commit(
        &self,
        business: &BusinessContext,
        state: &mut ConversationState,
        session_id: &str,
        utterance: &str,
        chosen: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<String, BookingError> {
        if let Some(name) = extract::extract_name(utterance) {
            state.customer_name = Some(name);
        }
        if let Some(phone) = extract::extract_phone(utterance) {
            state.customer_phone = Some(phone);
        }
        if extract::has_approval(utterance) {
            state.approved = true;
        }

        let name = state.customer_name.clone().unwrap_or_default();
        let phone = state.customer_phone.clone().unwrap_or_default();
        if name.is_empty() || phone.is_empty() || !state.approved {
            return Ok(missing_details_prompt(&name, &phone, state.approved));
        }

        let request = BookingRequest {
            session_id: session_id.to_string(),
            start: chosen,
            customer_name: name,
            customer_phone: phone,
            service_name: state.service_name.clone().unwrap_or_default(),
            staff_name: state.staff_name.clone().unwrap_or_default(),
            duration_minutes: state.duration_minutes.unwrap_or(30),
            price_minor: state.price_minor,
        };

        match self.ledger.commit(business, &request, now).await {
            Ok(appointment) => {
                self.sessions.clear(session_id);
                Ok(booking_confirmation(appointment.start))
            }
            Err(error) if error.is_slot_taken() => {
                // Back to slot selection; contact details stay collected.
                state.chosen_slot = None;
                let slots = self
                    .ledger
                    .availability()
                    .available_slots(business, self.lookahead_days, self.slot_minutes, now)
                    .await?;
                Ok(format!(
                    "Unfortunately {} was just taken. Open times: {}. Which one works?",
                    format_slot(chosen),
                    suggest_top(&slots)
                ))
            }
            Err(BookingError::ExternalSyncFailed(_)) => {
                state.chosen_slot = None;
                Ok("I could not sync the booking with the calendar, so nothing was reserved. \
                    Shall we try another time?"
                    .to_string())
            }
            Err(error) => Err(error),
        }
    }
}

/// Signals that the user is explicitly changing the date or time, as
/// opposed to reading out digits (a phone number) for an existing slot.
fn explicit_change_signal(text: &str) -> bool {
    let lowered = text.to_lowercase();
    extract::time::parse_clock_time(&lowered).is_some()
        || extract::time::parse_at_hour(&lowered).is_some()
        || extract::date::parse_iso_date(&lowered).is_some()
        || lowered.contains("o'clock")
        || lowered.contains("oclock")
        || dotted_date_signal(&lowered)
        || extract::parse_weekday(&lowered).is_some()
        || relative_day_signal(&lowered)
}

fn dotted_date_signal(lowered: &str) -> bool {
    // Any plausible DD.MM.(YY)YY shape; year coercion is irrelevant here.
    let probe = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
    extract::date::parse_dotted_date(lowered, probe).is_some()
}

fn relative_day_signal(lowered: &str) -> bool {
    lowered.split_whitespace().any(|word| word == "today" || word == "tomorrow")
}

fn day_candidates(slots: &[SlotCandidate], date: NaiveDate) -> Vec<SlotCandidate> {
    slots.iter().filter(|slot| slot.start.date() == date).cloned().collect()
}

fn suggest_top(slots: &[SlotCandidate]) -> String {
    let top: Vec<&str> =
        slots.iter().take(3).map(|candidate| candidate.display.as_str()).collect();
    if top.is_empty() {
        "none that I can see".to_string()
    } else {
        top.join(", ")
    }
}

fn unavailable_slot_reply(slots: &[SlotCandidate], date: NaiveDate, exact: NaiveDateTime) -> String {
    let day_slots = day_candidates(slots, date);
    if day_slots.is_empty() {
        return format!(
            "No open times on {date}. Nearest available: {}. Which one suits you?",
            suggest_top(slots)
        );
    }
    format!(
        "{} looks taken. Open times that day: {}. Which one would you like?",
        format_slot(exact),
        suggest_top(&day_slots)
    )
}

fn weekday_mismatch_question(text: &str, computed: NaiveDate) -> String {
    let lowered = text.to_lowercase();
    let spoken = extract::parse_weekday(&lowered)
        .map(weekday_name)
        .unwrap_or("that weekday");
    format!(
        "Just to be sure: {computed} is a {}, but you said {spoken}. Which one did you mean?",
        weekday_name(computed.weekday())
    )
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn service_prompt(business: &BusinessContext) -> String {
    let mut lines = vec!["Which service would you like?".to_string()];
    for service in business.named_services() {
        if service.price_minor > 0 {
            lines.push(format!(
                "- {} ({} minutes, {})",
                service.name, service.duration_minutes, service.price_minor
            ));
        } else {
            lines.push(format!("- {} ({} minutes)", service.name, service.duration_minutes));
        }
    }
    lines.join("\n")
}

fn staff_prompt(business: &BusinessContext) -> String {
    let names: Vec<&str> =
        business.named_staff().take(6).map(|member| member.name.as_str()).collect();
    format!(
        "Do you have a preferred staff member, or is anyone fine? Available: {}.",
        names.join(", ")
    )
}

fn price_prompt(state: &ConversationState) -> String {
    let service = state.service_name.as_deref().unwrap_or("the service");
    let duration = state.duration_minutes.unwrap_or(30);
    if state.price_minor > 0 {
        format!(
            "You picked {service} ({duration} minutes). The price is {}. Shall we continue? \
             Say yes to confirm.",
            state.price_minor
        )
    } else {
        format!("You picked {service} ({duration} minutes). Shall we continue? Say yes to confirm.")
    }
}

fn missing_details_prompt(name: &str, phone: &str, approved: bool) -> String {
    let mut missing = Vec::new();
    if name.is_empty() {
        missing.push("your full name");
    }
    if phone.is_empty() {
        missing.push("your phone number");
    }
    if !approved {
        missing.push("a confirmation (a quick \"yes\" works)");
    }
    format!("To complete the booking, could you share {}?", missing.join(", "))
}

fn booking_confirmation(slot: NaiveDateTime) -> String {
    format!("Your appointment is booked. Date and time: {}. Have a good day.", format_slot(slot))
}
