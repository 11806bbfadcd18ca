//! Prompt construction for the extraction strategies.
//!
//! Three prompts of decreasing sophistication. All request the same JSON
//! shape; downstream parsing tolerates whatever comes back.

use chrono::{NaiveDate, NaiveTime};

/// Rich primary prompt: full field list, multi-event decomposition, and
/// break synthesis rules.
pub fn primary_prompt(raw_text: &str, current_date: NaiveDate, current_time: NaiveTime) -> String {
    format!(
        "You are a calendar event extraction engine. Extract every event from the \
         user's message.\n\
         \n\
         Current date: {date} ({weekday})\n\
         Current time: {time}\n\
         \n\
         Rules:\n\
         - Respond with ONLY JSON, no commentary.\n\
         - A single event is an object; multiple events are an array, in the \
           order they appear in the message.\n\
         - Fields per event: \"title\" (short, no action verbs), \"date\" \
           (YYYY-MM-DD; resolve words like today/tomorrow against the current \
           date), \"start\" (HH:MM, 24-hour), \"end\" (HH:MM, 24-hour), and \
           optionally \"description\", \"location\", \"recurrenceRule\".\n\
         - If no end time is stated, use start plus the stated duration, or 60 \
           minutes if none.\n\
         - Sequenced activities (\"and then\", \"afterwards\") are separate \
           events. If the message states a break between activities (\"and \
           break of 10 minutes\"), emit a break event from the previous \
           activity's end lasting exactly the stated duration.\n\
         \n\
         Message: {text}",
        date = current_date,
        weekday = current_date.format("%A"),
        time = current_time.format("%H:%M"),
        text = raw_text,
    )
}

/// Terser prompt requesting the same shape.
pub fn simplified_prompt(
    raw_text: &str,
    current_date: NaiveDate,
    current_time: NaiveTime,
) -> String {
    format!(
        "Extract calendar event(s) from this message as JSON only (object, or \
         array for several events). Fields: title, date (YYYY-MM-DD), start \
         (HH:MM), end (HH:MM). Today is {date}, the time is {time}.\n\
         \n\
         Message: {text}",
        date = current_date,
        time = current_time.format("%H:%M"),
        text = raw_text,
    )
}

/// Strictly-structured prompt: repeats the exact required field list for
/// models that drift on looser instructions.
pub fn structured_prompt(
    raw_text: &str,
    current_date: NaiveDate,
    current_time: NaiveTime,
) -> String {
    format!(
        "Return exactly this JSON structure with real values and nothing else:\n\
         {{\n\
           \"title\": \"<string>\",\n\
           \"date\": \"<YYYY-MM-DD>\",\n\
           \"start\": \"<HH:MM>\",\n\
           \"end\": \"<HH:MM>\"\n\
         }}\n\
         Required fields: title, date, start, end. All four must be present.\n\
         Today is {date}; the current time is {time}. Resolve relative dates.\n\
         \n\
         Message: {text}",
        date = current_date,
        time = current_time.format("%H:%M"),
        text = raw_text,
    )
}
