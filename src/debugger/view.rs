//! Debugger panels, drawn with ratatui widgets into an off-screen buffer and
//! flattened to text for line-oriented front ends.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    text::Line,
    widgets::{Block, Paragraph, Widget},
};

use crate::emu::{Chip8, DISPLAY_X, DISPLAY_Y, Framebuffer, Opcode};

const PIXEL_ON: char = '█';
const PIXEL_OFF: char = ' ';

// Inner widths plus two border columns
const REGISTERS_WIDTH: u16 = 24 + 2;
const STACK_WIDTH: u16 = 9 + 2;
const DISPLAY_WIDTH: u16 = DISPLAY_X as u16 + 2;

/// Renders `widget` into a `width` x `height` buffer and returns its rows,
/// with trailing blanks trimmed.
fn render_to_string(widget: impl Widget, width: u16, height: u16) -> String {
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    widget.render(area, &mut buf);

    buf.content
        .chunks(usize::from(width))
        .map(|row| {
            let line: String = row.iter().map(|cell| cell.symbol()).collect();
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// PC, I, timers, the last instruction and V0-VF in two columns.
pub fn format_registers(chip8: &Chip8) -> String {
    let mut lines = vec![
        Line::from(format!("PC: {:03X}  I: {:03X}", chip8.pc(), chip8.index())),
        Line::from(format!(
            "DT: {:02X}   ST: {:02X}",
            chip8.delay_timer(),
            chip8.sound_timer()
        )),
        Line::from(format!(
            "OP: {:04X} {}",
            chip8.opcode(),
            Opcode::decode(chip8.opcode())
        )),
        Line::from(""),
    ];

    let v = chip8.registers();
    lines.extend((0..8).map(|idx| {
        Line::from(format!(
            "V{:X}: {:02X}   V{:X}: {:02X}",
            idx,
            v[idx],
            idx + 8,
            v[idx + 8]
        ))
    }));

    if chip8.is_waiting_for_key() {
        lines.push(Line::from("Waiting for key press"));
    }

    let height = lines.len() as u16 + 2;
    let panel = Paragraph::new(lines).block(Block::bordered().title(" Registers "));
    render_to_string(panel, REGISTERS_WIDTH, height)
}

pub fn format_stack(stack: &[u16]) -> String {
    let mut lines: Vec<Line> = stack
        .iter()
        .enumerate()
        .map(|(i, val)| Line::from(format!("{:02}: {:03X}", i, val)))
        .collect();

    if lines.is_empty() {
        lines.push(Line::from("Empty"));
    }

    let height = lines.len() as u16 + 2;
    let panel = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::bordered().title(" Stack "));
    render_to_string(panel, STACK_WIDTH, height)
}

/// One text line per display row, framed.
pub fn format_screen(display: &Framebuffer) -> String {
    let lines: Vec<Line> = display
        .chunks_exact(DISPLAY_X)
        .map(|row| {
            row.iter()
                .map(|&pixel| if pixel != 0 { PIXEL_ON } else { PIXEL_OFF })
                .collect::<String>()
                .into()
        })
        .collect();

    let panel = Paragraph::new(lines).block(Block::bordered().title(" Display "));
    render_to_string(panel, DISPLAY_WIDTH, DISPLAY_Y as u16 + 2)
}

/// 16 bytes per line, each line prefixed with its address.
pub fn format_mem_dump(offset: u16, data: &[u8]) -> String {
    data.chunks(16)
        .enumerate()
        .map(|(row, bytes)| {
            let hex: Vec<String> = bytes.iter().map(|byte| format!("{:02X}", byte)).collect();
            format!("{:03X}: {}", usize::from(offset) + row * 16, hex.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_disasm(instructions: &[(u16, u16, Opcode)]) -> String {
    instructions
        .iter()
        .map(|(addr, word, opcode)| format!("{:03X}: {:04X}  {}", addr, word, opcode))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::DISPLAY_SIZE;

    #[test]
    fn registers_show_last_instruction() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load(&[0x6A, 0x05]).unwrap();
        chip8.step().unwrap();

        let text = format_registers(&chip8);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("┌ Registers"));
        assert!(lines[1].contains("PC: 202  I: 000"));
        assert!(text.contains("OP: 6A05 LD VA, 0x05"));
        assert!(text.contains("V2: 00   VA: 05"));
        assert!(!text.contains("Waiting"));
        assert!(lines.iter().all(|line| line.chars().count() <= REGISTERS_WIDTH as usize));
    }

    #[test]
    fn registers_report_key_wait() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load(&[0xF0, 0x0A]).unwrap();
        chip8.step().unwrap();

        assert!(format_registers(&chip8).contains("Waiting for key press"));
    }

    #[test]
    fn stack_lists_entries() {
        assert!(format_stack(&[]).contains("Empty"));

        let text = format_stack(&[0x200, 0x30A]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("00: 200"));
        assert!(lines[2].contains("01: 30A"));
    }

    #[test]
    fn screen_has_one_line_per_row() {
        let mut display = [0u8; DISPLAY_SIZE];
        display[0] = 1;
        display[DISPLAY_SIZE - 1] = 1;

        let text = format_screen(&display);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), DISPLAY_Y + 2);
        assert!(lines[1].starts_with("│█"));
        assert_eq!(lines[1].chars().count(), DISPLAY_X + 2);
        assert!(lines[DISPLAY_Y].ends_with("█│"));
    }

    #[test]
    fn mem_dump_wraps_every_sixteen_bytes() {
        let data: Vec<u8> = (0..18).collect();
        let text = format_mem_dump(0x200, &data);
        assert_eq!(
            text,
            "200: 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F\n210: 10 11"
        );
    }

    #[test]
    fn disasm_lines() {
        let text = format_disasm(&[(0x200, 0x00E0, Opcode::decode(0x00E0))]);
        assert_eq!(text, "200: 00E0  CLS");
    }
}
