use grabber_core::AppViewModel;

const BAR_WIDTH: usize = 30;

/// Text lines for a changed view: status, progress and the current choices.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = vec![format!("> {}", view.status)];
    if let Some(title) = &view.title {
        lines.push(format!("  title: {title}"));
    }
    if let Some(percent) = view.progress {
        lines.push(format!("  {}", progress_bar(percent)));
    }
    let destination = view
        .destination
        .as_ref()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "(none, use dest <dir>)".to_string());
    let action = if view.download_enabled { "on" } else { "off" };
    lines.push(format!(
        "  codec: {} | folder: {} | download: {}",
        view.codec, destination, action
    ));
    lines
}

/// The stream list, selected row marked with `*`.
pub fn render_streams(view: &AppViewModel) -> Vec<String> {
    if view.streams.is_empty() {
        return vec!["  no streams yet, use probe <url>".to_string()];
    }
    view.streams
        .iter()
        .map(|row| {
            let marker = if row.selected { '*' } else { ' ' };
            format!("  {marker} {:>2}. {}", row.index + 1, row.label)
        })
        .collect()
}

pub fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = BAR_WIDTH * usize::from(percent) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent
    )
}
