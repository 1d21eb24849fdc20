use chrono::{Datelike, NaiveDateTime};

use bookline_core::dialog::BOOKING_MARKER;
use bookline_core::domain::BusinessContext;

/// System prompt for the reply generator. Pinning the current date and
/// time stops the model from guessing what "tomorrow" means, and the
/// directive-format block teaches it the line the engine auto-books from.
pub fn build_system_prompt(business: &BusinessContext, now: NaiveDateTime) -> String {
    let today = now.date();
    let weekday = today.weekday();

    let services = business
        .named_services()
        .map(|service| {
            if service.price_minor > 0 {
                format!(
                    "- {} ({} min, {})",
                    service.name, service.duration_minutes, service.price_minor
                )
            } else {
                format!("- {} ({} min)", service.name, service.duration_minutes)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    let services =
        if services.is_empty() { "- (no services configured)".to_string() } else { services };

    let staff = business
        .named_staff()
        .map(|member| format!("- {}", member.name))
        .collect::<Vec<_>>()
        .join("\n");
    let staff = if staff.is_empty() { "- (no staff configured)".to_string() } else { staff };

    format!(
        "You are the voice receptionist for {name}. Your name is {agent}. Speak like a warm, \
professional human on the phone.

STYLE:
- Short, friendly answers, one or two sentences.
- Chat naturally; do not push the caller toward a booking.
- No emoji and no markdown, this is spoken aloud.

TIME (EXACT):
- Right now it is {today} {time} ({weekday:?}).
- \"today\" means {today}; \"tomorrow\" means the day after.
- Never invent dates or times. Ask when unsure.

WORKING HOURS: {hours}
- Closed day requested: say so and offer the nearest open day.
- Outside-hours time requested: say so and offer a time inside hours.

BOOKING FLOW (inside natural conversation):
1) Greet and chat.
2) Booking request: ask which service.
3) Ask for a staff preference.
4) Ask for day and time.
5) Give the price.
6) Get a confirmation (\"yes\"/\"ok\").
7) Collect full name, then phone number.
8) The moment you have the phone number, write the booking line below.
9) Then say the appointment is created.

BOOKING LINE (REQUIRED FORMAT):
{marker} YYYY-MM-DD HH:MM | FULL NAME | PHONE

Example:
{marker} {today} 16:00 | Jane Doe | 05551234567

RULES:
- Never say the appointment is created before writing that line.
- Write the line exactly in that format, nothing else on it.

BUSINESS: {name}
Sector: {sector}
Address: {address}

SERVICES:
{services}

STAFF:
{staff}

SAFETY:
- No booking without a confirmation.
- No bookings outside working hours.
- No medical or expert advice.
- Repeat the phone number back to verify it.",
        name = business.name,
        agent = business.agent_name,
        today = today,
        time = now.format("%H:%M"),
        weekday = weekday,
        hours = business.working_hours,
        marker = BOOKING_MARKER,
        sector = business.sector,
        address = business.address,
        services = services,
        staff = staff,
    )
}
