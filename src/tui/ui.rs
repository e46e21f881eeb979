//! UI rendering for the emulator.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use super::app::EmulatorApp;

/// Width of the left column (registers, screen, info).
const SIDE_WIDTH: u16 = 20;
/// Nibbles per memory dump row.
const MEM_COLUMNS: usize = 16;
/// Memory panel: row label, 16 two-char cells, borders.
const MEM_WIDTH: u16 = 6 + MEM_COLUMNS as u16 * 2 + 2;
/// Disassembly panel width.
const DISASM_WIDTH: u16 = 18;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &EmulatorApp) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(SIDE_WIDTH),
            Constraint::Length(MEM_WIDTH),
            Constraint::Length(DISASM_WIDTH),
            Constraint::Min(0),
        ])
        .split(frame.area());

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(4 * 2 + 2),
            Constraint::Min(0),
            Constraint::Length(5),
        ])
        .split(columns[0]);

    draw_registers(frame, side[0], app);
    draw_screen(frame, side[1], app);
    draw_info(frame, side[3], app);

    draw_memory(frame, columns[1], app);
    draw_disassembly(frame, columns[2], app);
}

fn draw_registers(frame: &mut Frame, area: Rect, app: &EmulatorApp) {
    let regs = &app.registers;
    let value = Style::default().fg(Color::White);

    let content = vec![
        Line::from(vec![
            Span::raw(" X: "),
            Span::styled(format!("{:X}", regs.x), value),
            Span::raw("  Y: "),
            Span::styled(format!("{:X}", regs.y), value),
            Span::raw("  Z: "),
            Span::styled(format!("{:X}", regs.z), value),
        ]),
        Line::from(vec![
            Span::raw(" PC: "),
            Span::styled(format!("{:02X}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("  LC: "),
            Span::styled(format!("{:02X}", regs.loc), value),
        ]),
        Line::from(vec![
            Span::raw(" C: "),
            Span::styled(flag(regs.carry), flag_style(regs.carry)),
            Span::raw("  UC: "),
            Span::styled(flag(regs.use_carry), flag_style(regs.use_carry)),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title("[Registers]")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw the 4x4 screen. Each pixel is 4 columns by 2 rows so it looks square.
fn draw_screen(frame: &mut Frame, area: Rect, app: &EmulatorApp) {
    let on = Style::default().fg(Color::White).bg(Color::White);

    let content: Vec<Line> = app
        .screen
        .iter()
        .flat_map(|row| {
            let line = Line::from(
                row.iter()
                    .map(|&lit| if lit { Span::styled("####", on) } else { Span::raw("    ") })
                    .collect::<Vec<_>>(),
            );
            [line.clone(), line]
        })
        .collect();

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title("[Screen]")
            .borders(Borders::ALL));

    frame.render_widget(paragraph, area);
}

/// Draw the full 256-nibble RAM dump with LOC highlighted.
fn draw_memory(frame: &mut Frame, area: Rect, app: &EmulatorApp) {
    let loc = usize::from(app.registers.loc);

    let mut header = vec![Span::raw("    ")];
    header.extend((0..MEM_COLUMNS).map(|col| {
        Span::styled(format!(" {:X}", col), Style::default().fg(Color::DarkGray))
    }));

    let mut content = vec![Line::from(header)];
    for (row, nibbles) in app.memory.chunks(MEM_COLUMNS).enumerate() {
        let base = row * MEM_COLUMNS;
        let mut spans = vec![Span::styled(
            format!("{:02X}: ", base),
            Style::default().fg(Color::DarkGray),
        )];

        for (col, &value) in nibbles.iter().enumerate() {
            let style = if base + col == loc {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            spans.push(Span::styled(format!("{:X} ", value), style));
        }
        content.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title("[Memory]")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(paragraph, area);
}

/// Draw the disassembly window centered on PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &EmulatorApp) {
    let lines = app.get_disassembly(usize::from(area.height.saturating_sub(2)));

    let items: Vec<ListItem> = lines
        .iter()
        .map(|line| {
            let Some(addr) = line.addr else {
                return ListItem::new("");
            };
            let (prefix, style) = if line.is_current {
                ("> ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            } else {
                ("  ", Style::default())
            };
            ListItem::new(format!("{}{:02X}:  {}", prefix, addr, line.text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title("[Disassembly]")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

fn draw_info(frame: &mut Frame, area: Rect, app: &EmulatorApp) {
    let info = Paragraph::new(vec![
        Line::from(format!(" PBPU-Emu {}", env!("CARGO_PKG_VERSION"))),
        Line::from(" by  PixelBrush"),
        Line::from(Span::styled(
            format!(" {}", app.status),
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(info, area);
}

fn flag(set: bool) -> &'static str {
    if set { "1" } else { "0" }
}

fn flag_style(set: bool) -> Style {
    if set {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    fn render(app: &EmulatorApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();

        let buffer = terminal.backend().buffer();
        let width = usize::from(buffer.area.width);
        let mut text = String::new();
        for row in buffer.content().chunks(width) {
            for cell in row {
                text.push_str(cell.symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_draw_panels() {
        let mut app = EmulatorApp::new(&[0x55, 0x66, 0x10], RunMode::FreeRun { delay: Duration::ZERO });
        app.step();
        let screen = render(&app);

        assert!(screen.contains("[Registers]"));
        assert!(screen.contains("[Memory]"));
        assert!(screen.contains("[Disassembly]"));
        assert!(screen.contains("X: 5"));
        assert!(screen.contains("> 01:  WTY 6"));
        assert!(screen.contains("PBPU-Emu"));
    }

    #[test]
    fn test_current_row_stays_centered_at_rom_start() {
        let app = EmulatorApp::new(&[0x55, 0x66], RunMode::Step);
        let screen = render(&app);
        let start = usize::from(SIDE_WIDTH + MEM_WIDTH);
        let panel: Vec<String> = screen
            .lines()
            .map(|row| row.chars().skip(start).take(usize::from(DISASM_WIDTH)).collect())
            .collect();

        // 22 inner rows give a 21-row window; PC 0 sits 10 rows below the top border
        let current = panel.iter().position(|row| row.contains("> 00:  WTX 5"));
        assert_eq!(current, Some(1 + 10));
        assert!(panel[12].contains("01:  WTY 6"));
        assert!(panel[1..11].iter().all(|row| !row.contains(':')));
    }

    #[test]
    fn test_draw_lit_pixel() {
        // WTZ F, ZTR: nibble 0 fully lit
        let mut app = EmulatorApp::new(&[0x7F, 0x80], RunMode::Step);
        app.step();
        app.step();
        let screen = render(&app);
        assert!(screen.contains("################"));
    }
}
