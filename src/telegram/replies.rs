//! Canned bot replies.

/// The reply for an incoming text, or `None` when there is nothing to say.
///
/// `/start` and `/help` are matched case-insensitively after trimming.
/// Anything containing a digit is treated as an expense note. Without a
/// sender name the greetings drop the name.
pub fn reply_for(text: &str, first_name: Option<&str>) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let name = first_name.filter(|n| !n.trim().is_empty());

    let reply = match trimmed.to_lowercase().as_str() {
        "/start" => format!(
            "Witaj{}! 👋\nJestem botem Spendorro - pomogę Ci zarządzać finansami.",
            name.map(|n| format!(" {n}")).unwrap_or_default()
        ),
        "/help" => "Dostępne komendy:\n/start - Start bota\n/help - Pomoc\n\n\
                    Możesz też po prostu napisać wydatek, np: 'kawa 5'"
            .to_string(),
        _ if text.chars().any(|c| c.is_ascii_digit()) => {
            "Widzę, że piszesz o wydatku! 💰\nFunkcja zapisywania wydatków będzie wkrótce dostępna."
                .to_string()
        }
        _ => format!(
            "Dziękuję za wiadomość{}! 😊\nNa razie jestem w fazie rozwoju.",
            name.map(|n| format!(", {n}")).unwrap_or_default()
        ),
    };
    Some(reply)
}
