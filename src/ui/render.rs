//! 界面渲染
//!
//! 按生命周期绘制：大厅（类别选择、计时开关、错误提示）、调度、现场 / 转运（标题栏 + 计时、
//! 会话记录、体征面板、输入框）、讲评生成中、讲评报告。免责声明与提示、器材包、快捷操作、
//! 无线电报告清单以弹窗覆盖。

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Wrap,
    },
    Frame,
};

use crate::core::{format_clock, HintState, Lifecycle, UiState};
use crate::memory::{Role, DISCLAIMER_TEXT};
use crate::scenario::{Vitals, CRITICAL_CRITERIA, EQUIPMENT_BAGS, QUICK_ACTIONS, RADIO_REPORT_CHECKLIST};
use crate::ui::app::{App, Popup};

/// 剩余少于该秒数时计时器变红
const LOW_TIME_SECS: u32 = 120;

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        lines.push(line);
    }
    lines
}

/// 体征面板的行；未揭示的读数显示为 "--"
pub fn vitals_rows(v: &Vitals) -> Vec<(&'static str, String)> {
    fn num(x: Option<f64>, unit: &str) -> String {
        x.map(|n| format!("{n:.0}{unit}")).unwrap_or_else(|| "--".into())
    }
    fn text(x: &Option<String>) -> String {
        x.clone().unwrap_or_else(|| "--".into())
    }
    vec![
        ("HR", num(v.hr, " bpm")),
        ("BP", v.blood_pressure().unwrap_or_else(|| "--".into())),
        ("RR", num(v.rr, " /min")),
        ("SpO2", num(v.spo2, "%")),
        ("EtCO2", num(v.etco2, " mmHg")),
        ("BGL", num(v.bgl, " mg/dL")),
        ("Temp", v.temp.map(|t| format!("{t:.1}°F")).unwrap_or_else(|| "--".into())),
        ("Skin", text(&v.skin)),
        ("Pupils", text(&v.pupils)),
        ("LOC", text(&v.loc)),
    ]
}

/// 计时器文本与颜色；None 表示不计时
pub fn timer_label(time_left: Option<u32>, paused: bool) -> Option<(String, Color)> {
    let secs = time_left?;
    let mut label = format_clock(secs);
    if paused {
        label.push_str(" (paused)");
    }
    let color = if secs < LOW_TIME_SECS { Color::Red } else { Color::Green };
    Some((label, color))
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn popup_block(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

/// 绘制一帧；将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(f: &mut Frame, state: &UiState, app: &App, out: &mut (usize, usize)) {
    match state.lifecycle {
        Lifecycle::Lobby => draw_lobby(f, state),
        Lifecycle::Dispatch => draw_dispatch(f, state),
        Lifecycle::Active | Lifecycle::Transport => draw_scene(f, state, app, out),
        Lifecycle::Evaluating => draw_centered_notice(
            f,
            " Evaluating ",
            "Generating debrief… the proctor is reviewing your performance.",
        ),
        Lifecycle::Debrief => draw_debrief(f, state, app, out),
    }
    if state.show_disclaimer {
        draw_disclaimer(f);
    }
}

fn draw_lobby(f: &mut Frame, state: &UiState) {
    let mut lines = vec![
        Line::from(Span::styled(
            "NREMT Scenario Emulator",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Choose a scenario:"),
        Line::from("  [1] Medical    [2] Trauma    [3] Random"),
        Line::from(""),
        Line::from(format!(
            "  [x] Timed mode: {}",
            if state.timed_mode { "ON (Medical 12:00 / Trauma 10:00)" } else { "OFF" }
        )),
        Line::from("  [F6] Toggle voice    [Ctrl+Q] Quit"),
        Line::from(""),
    ];
    if state.scenario_pending {
        lines.push(Line::from(Span::styled(
            "Dispatching a new call…",
            Style::default().fg(Color::Cyan),
        )));
    }
    if let Some(alert) = &state.alert {
        lines.push(Line::from(Span::styled(alert.clone(), Style::default().fg(Color::Red))));
    }
    let area = centered_rect(70, 60, f.area());
    let p = Paragraph::new(Text::from(lines))
        .block(popup_block("Lobby", Color::Yellow))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_dispatch(f: &mut Frame, state: &UiState) {
    let Some(scenario) = &state.scenario else {
        return;
    };
    let lines = vec![
        Line::from(Span::styled(
            format!("{} CALL", scenario.scenario_type.as_str()),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(scenario.dispatch_message.clone()),
        Line::from(""),
        Line::from(format!("Environment: {}", scenario.environment)),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to respond",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let area = centered_rect(70, 50, f.area());
    let p = Paragraph::new(Text::from(lines))
        .block(popup_block("Dispatch", Color::Red))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_centered_notice(f: &mut Frame, title: &str, text: &str) {
    let area = centered_rect(60, 20, f.area());
    let p = Paragraph::new(text)
        .block(Block::default().title(title).borders(Borders::ALL))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_scene(f: &mut Frame, state: &UiState, app: &App, out: &mut (usize, usize)) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(5)])
        .split(f.area());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[1]);

    draw_header(f, state, chunks[0]);
    draw_transcript(f, state, app.scroll, body[0], out);
    draw_vitals(f, &state.vitals, body[1]);
    draw_input(f, state, &app.input, chunks[2]);

    match app.popup {
        Popup::Equipment { bag, item } => draw_equipment(f, bag, item),
        Popup::QuickActions { index } => draw_quick_actions(f, index),
        Popup::None => {}
    }
    if state.report_aid_open {
        draw_report_aid(f);
    }
    match &state.hint {
        HintState::Hidden => {}
        HintState::Loading => draw_hint(f, "Consulting the proctor…"),
        HintState::Ready(text) => draw_hint(f, text),
    }
}

fn draw_header(f: &mut Frame, state: &UiState, area: Rect) {
    let title = state.scenario.as_ref().map(|s| s.title.as_str()).unwrap_or("");
    let mut spans = vec![
        Span::styled(
            if state.lifecycle == Lifecycle::Transport { "TRANSPORT " } else { "ON SCENE " },
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("│ {} │ Phase: {} ", title, state.phase_label)),
    ];
    if let Some((label, color)) = timer_label(state.time_left, state.timer_paused) {
        spans.push(Span::styled(
            format!("│ {label}"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }
    let p = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_transcript(
    f: &mut Frame,
    state: &UiState,
    scroll: usize,
    area: Rect,
    out: &mut (usize, usize),
) {
    let block = Block::default()
        .title(" Scene ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let content_width = area.width.saturating_sub(2).saturating_sub(1) as usize; // 边框 + 滚动条

    // 每条消息按宽度换行；消息之间加空行分隔
    let mut text_lines: Vec<Line> = Vec::new();
    for (idx, m) in state.transcript.iter().enumerate() {
        if idx > 0 {
            text_lines.push(Line::from(""));
        }
        let (prefix, color) = match m.role {
            Role::User => ("EMT ", Color::Cyan),
            Role::Narrator => ("    ", Color::Green),
            Role::Notice => ("!!! ", Color::Magenta),
        };
        for (i, line) in wrap_text(&m.content, content_width.saturating_sub(4).max(20))
            .into_iter()
            .enumerate()
        {
            let pref = if i == 0 { prefix } else { "    " };
            let body_style = if m.role == Role::Notice {
                Style::default().fg(color)
            } else {
                Style::default()
            };
            text_lines.push(Line::from(vec![
                Span::styled(pref, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::styled(line, body_style),
            ]));
        }
    }
    if state.turn_pending {
        text_lines.push(Line::from(""));
        text_lines.push(Line::from(Span::styled(
            "    …",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let inner = block.inner(area);
    let content_height = inner.height as usize;
    let total_lines = text_lines.len();
    let scroll_offset = scroll.min(total_lines.saturating_sub(content_height));

    f.render_widget(block, area);
    let paragraph = Paragraph::new(Text::from(text_lines)).scroll((scroll_offset as u16, 0));
    f.render_widget(paragraph, inner);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
    }

    out.0 = total_lines;
    out.1 = content_height;
}

fn draw_vitals(f: &mut Frame, vitals: &Vitals, area: Rect) {
    let lines: Vec<Line> = vitals_rows(vitals)
        .into_iter()
        .map(|(label, value)| {
            let color = if value == "--" { Color::DarkGray } else { Color::White };
            Line::from(vec![
                Span::styled(format!("{label:<7}"), Style::default().fg(Color::Cyan)),
                Span::styled(value, Style::default().fg(color)),
            ])
        })
        .collect();
    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().title(" Vitals ").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn draw_input(f: &mut Frame, state: &UiState, input: &str, area: Rect) {
    let prompt = if state.turn_pending { " Waiting for the scene… " } else { " Your action " };
    let keys = if state.lifecycle == Lifecycle::Transport {
        " Enter send │ F1 hint │ F2 call hospital │ F3 arrive │ F4 equipment │ F5 quick │ Ctrl+R reset "
    } else {
        " Enter send │ F1 hint │ F2 begin transport │ F4 equipment │ F5 quick │ Ctrl+R reset "
    };
    let block = Block::default()
        .title(prompt)
        .title_bottom(Line::from(Span::styled(keys, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let p = Paragraph::new(input)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(if state.input_locked() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        });
    f.render_widget(p, area);
}

fn draw_list_popup(f: &mut Frame, title: &str, items: Vec<ListItem>, selected: usize) {
    let area = centered_rect(50, 60, f.area());
    f.render_widget(Clear, area);
    let list = List::new(items)
        .block(popup_block(title, Color::Cyan))
        .highlight_style(Style::default().bg(Color::Cyan).fg(Color::Black))
        .highlight_symbol("> ");
    let mut list_state = ListState::default();
    list_state.select(Some(selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_equipment(f: &mut Frame, bag: usize, item: usize) {
    let Some(selected_bag) = EQUIPMENT_BAGS.get(bag) else {
        return;
    };
    let items = selected_bag.items.iter().map(|i| ListItem::new(*i)).collect();
    let tabs: Vec<&str> = EQUIPMENT_BAGS.iter().map(|b| b.label).collect();
    let title = format!("{} ◀ {} ▶", selected_bag.title, tabs.join(" | "));
    draw_list_popup(f, &title, items, item);
}

fn draw_quick_actions(f: &mut Frame, index: usize) {
    let items = QUICK_ACTIONS.iter().map(|(label, _)| ListItem::new(*label)).collect();
    draw_list_popup(f, "Quick Actions", items, index);
}

fn draw_report_aid(f: &mut Frame) {
    let area = centered_rect(50, 60, f.area());
    f.render_widget(Clear, area);
    let lines: Vec<Line> = RADIO_REPORT_CHECKLIST
        .iter()
        .enumerate()
        .map(|(i, item)| Line::from(format!("{:>2}. {}", i + 1, item)))
        .collect();
    let p = Paragraph::new(Text::from(lines))
        .block(popup_block("Radio Report (Esc to close)", Color::Green))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_hint(f: &mut Frame, text: &str) {
    let area = centered_rect(60, 30, f.area());
    f.render_widget(Clear, area);
    let p = Paragraph::new(text)
        .block(popup_block("Proctor Hint (Esc to close)", Color::Yellow))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_debrief(f: &mut Frame, state: &UiState, app: &App, out: &mut (usize, usize)) {
    let Some(report) = &state.debrief else {
        return;
    };
    let (verdict, color) = if report.passed {
        ("PASSED", Color::Green)
    } else {
        ("FAILED", Color::Red)
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled(verdict, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::raw(format!("   Score: {:.0}/100", report.score)),
        ]),
        Line::from(""),
        Line::from(Span::styled("Critical failures", Style::default().add_modifier(Modifier::BOLD))),
    ];
    if report.critical_failures.is_empty() {
        lines.push(Line::from("  None"));
    }
    for failure in &report.critical_failures {
        lines.push(Line::from(Span::styled(
            format!("  • {failure}"),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Summary", Style::default().add_modifier(Modifier::BOLD))));
    lines.push(Line::from(report.feedback_summary.clone()));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Clinical reasoning",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(report.clinical_reasoning.clone()));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Graded against {} NREMT critical criteria.", CRITICAL_CRITERIA.len()),
        Style::default().fg(Color::DarkGray),
    )));

    let area = f.area();
    let block = Block::default()
        .title(" Debrief ")
        .title_bottom(Line::from(Span::styled(
            " Enter new scenario │ ↑↓ scroll │ Ctrl+Q quit ",
            Style::default().fg(Color::DarkGray),
        )))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    let inner_height = block.inner(area).height as usize;
    let total = lines.len();
    let p = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll.min(total.saturating_sub(inner_height)) as u16, 0));
    f.render_widget(p, area);
    out.0 = total;
    out.1 = inner_height;
}

fn draw_disclaimer(f: &mut Frame) {
    let area = centered_rect(60, 50, f.area());
    f.render_widget(Clear, area);
    let text = Text::from(vec![
        Line::from(DISCLAIMER_TEXT),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to acknowledge",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    let p = Paragraph::new(text)
        .block(popup_block("Disclaimer", Color::Red))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Message;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn test_vitals_rows_show_unrevealed_as_dashes() {
        let v = Vitals {
            hr: Some(110.0),
            bp_systolic: Some(120.0),
            ..Vitals::default()
        };
        let rows = vitals_rows(&v);
        assert_eq!(rows[0], ("HR", "110 bpm".to_string()));
        // 只有收缩压时不显示血压
        assert_eq!(rows[1], ("BP", "--".to_string()));
        assert_eq!(rows[9], ("LOC", "--".to_string()));
    }

    #[test]
    fn test_timer_label() {
        assert_eq!(timer_label(None, false), None);
        assert_eq!(timer_label(Some(720), false), Some(("12:00".into(), Color::Green)));
        assert_eq!(
            timer_label(Some(119), true),
            Some(("01:59 (paused)".into(), Color::Red))
        );
    }

    #[test]
    fn test_wrap_text_keeps_paragraphs() {
        assert_eq!(wrap_text("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_text("a\n\nb", 4), vec!["a", "", "b"]);
    }

    #[test]
    fn test_draw_scene_smoke() {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let state = UiState {
            lifecycle: Lifecycle::Active,
            transcript: vec![
                Message::narrator("DISPATCH: Chest pain\n\nYou arrive on scene. What do you do?"),
                Message::user("BSI"),
                Message::notice("Connection error: boom"),
            ],
            hint: HintState::Ready("Check the airway".into()),
            time_left: Some(90),
            ..UiState::default()
        };
        let app = App::new();
        let mut out = (0, 0);
        terminal.draw(|f| draw(f, &state, &app, &mut out)).unwrap();
        assert!(out.0 >= 5);
        let buffer = terminal.backend().buffer().clone();
        let rendered: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(rendered.contains("Vitals"));
        assert!(rendered.contains("01:30"));
        assert!(rendered.contains("Check the airway"));
    }
}
