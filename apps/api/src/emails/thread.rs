//! Reply/quote heuristics and thread grouping for candidate correspondence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::email::Email;

/// A message body split into what the sender wrote and what they quoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedBody {
    pub reply: String,
    pub quoted: Option<String>,
}

const HEADER_FIELDS: &[&str] = &["sent:", "date:", "to:", "subject:", "cc:"];

fn is_attribution(line: &str, next: Option<&str>) -> bool {
    let line = line.trim();
    if !line.starts_with("On ") {
        return false;
    }
    line.ends_with("wrote:") || next.is_some_and(|n| n.trim().ends_with("wrote:"))
}

fn is_original_message_separator(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    lower.starts_with("-----") && lower.contains("original message")
}

/// An Outlook-style `From:` block: a `From:` line after a blank line, followed
/// closely by other header fields.
fn is_forward_header(lines: &[&str], i: usize) -> bool {
    if !lines[i].trim_start().to_lowercase().starts_with("from:") {
        return false;
    }
    if i > 0 && !lines[i - 1].trim().is_empty() {
        return false;
    }
    lines[i + 1..]
        .iter()
        .take(4)
        .any(|l| {
            let l = l.trim_start().to_lowercase();
            HEADER_FIELDS.iter().any(|h| l.starts_with(h))
        })
}

fn is_quote_start(lines: &[&str], i: usize) -> bool {
    let line = lines[i];
    line.trim_start().starts_with('>')
        || is_attribution(line, lines.get(i + 1).copied())
        || is_original_message_separator(line)
        || is_forward_header(lines, i)
}

pub fn split_reply(body: &str) -> ParsedBody {
    let lines: Vec<&str> = body.lines().collect();
    let cut = (0..lines.len()).find(|&i| is_quote_start(&lines, i));

    match cut {
        None => ParsedBody {
            reply: body.trim().to_string(),
            quoted: None,
        },
        Some(cut) => ParsedBody {
            reply: lines[..cut].join("\n").trim().to_string(),
            quoted: Some(lines[cut..].join("\n")),
        },
    }
}

/// Lower-cased subject with any stack of `Re:`/`Fwd:`/`Fw:` prefixes removed.
pub fn normalize_subject(subject: &str) -> String {
    let mut s = subject.trim();
    loop {
        let lower = s.to_lowercase();
        let stripped = ["re:", "fwd:", "fw:"]
            .iter()
            .find(|p| lower.starts_with(*p))
            .map(|p| s[p.len()..].trim_start());
        match stripped {
            Some(rest) => s = rest,
            None => return lower,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    pub key: String,
    pub subject: String,
    pub messages: Vec<Email>,
    pub unread: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

fn thread_key(email: &Email) -> String {
    match &email.thread_id {
        Some(id) if !id.is_empty() => format!("id:{id}"),
        _ => format!("subject:{}", normalize_subject(&email.subject)),
    }
}

/// Groups messages into threads: oldest message first within a thread, most
/// recently active thread first overall.
pub fn group_threads<'a>(emails: impl IntoIterator<Item = &'a Email>) -> Vec<Thread> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Email>> = HashMap::new();
    for email in emails {
        let key = thread_key(email);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(email.clone());
    }

    let mut threads: Vec<Thread> = order
        .into_iter()
        .filter_map(|key| {
            let mut messages = groups.remove(&key)?;
            messages.sort_by_key(|m| m.sent_at);
            let subject = messages
                .first()
                .map(|m| m.subject.clone())
                .unwrap_or_default();
            Some(Thread {
                unread: messages.iter().filter(|m| !m.read).count(),
                last_activity: messages.iter().filter_map(|m| m.sent_at).max(),
                key,
                subject,
                messages,
            })
        })
        .collect();

    threads.sort_by(|a, b| match (a.last_activity, b.last_activity) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    threads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::email::{email, Direction};
    use chrono::TimeZone;

    #[test]
    fn test_plain_body_has_no_quote() {
        let parsed = split_reply("Thanks, see you Monday.\n");
        assert_eq!(parsed.reply, "Thanks, see you Monday.");
        assert!(parsed.quoted.is_none());
    }

    #[test]
    fn test_gmail_attribution() {
        let body = "Sounds good!\n\nOn Tue, Mar 5, 2024 at 10:00 AM Jane <jane@x.com> wrote:\n> Can you do 3pm?";
        let parsed = split_reply(body);
        assert_eq!(parsed.reply, "Sounds good!");
        assert!(parsed.quoted.unwrap().starts_with("On Tue"));
    }

    #[test]
    fn test_wrapped_attribution() {
        let body = "Yes.\nOn Tue, Mar 5, 2024 at 10:00 AM Jane Doe <jane@x.com>\nwrote:\n> hi";
        assert_eq!(split_reply(body).reply, "Yes.");
    }

    #[test]
    fn test_chevron_quotes() {
        let parsed = split_reply("Confirmed\n> old line\n> older line");
        assert_eq!(parsed.reply, "Confirmed");
        assert_eq!(parsed.quoted.as_deref(), Some("> old line\n> older line"));
    }

    #[test]
    fn test_outlook_blocks() {
        let separator = "Attached.\n-----Original Message-----\nFrom: a@b.com";
        assert_eq!(split_reply(separator).reply, "Attached.");

        let header = "Will do.\n\nFrom: Recruiter <r@x.com>\nSent: Monday\nTo: me";
        assert_eq!(split_reply(header).reply, "Will do.");
    }

    #[test]
    fn test_from_inside_prose_is_not_a_header() {
        let body = "Hello\nFrom: my side all good\nthanks";
        assert!(split_reply(body).quoted.is_none());
    }

    #[test]
    fn test_normalize_subject_strips_prefix_stack() {
        assert_eq!(normalize_subject("RE: Fwd: re:  Interview"), "interview");
        assert_eq!(normalize_subject("Offer"), "offer");
    }

    #[test]
    fn test_group_threads_by_subject_and_recency() {
        let mut a1 = email("1", "c1", None, Direction::Sent);
        a1.subject = "Interview".into();
        a1.sent_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        let mut a2 = email("2", "c1", None, Direction::Received);
        a2.subject = "Re: Interview".into();
        a2.read = true;
        a2.sent_at = Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap());
        let mut b1 = email("3", "c1", None, Direction::Sent);
        b1.subject = "Offer".into();
        b1.sent_at = Some(Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap());

        let all = [a2, b1, a1];
        let threads = group_threads(all.iter());
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].subject, "Offer");
        assert_eq!(threads[1].messages[0].id, "1");
        assert_eq!(threads[1].subject, "Interview");
        assert_eq!(threads[1].unread, 1);
    }
}
