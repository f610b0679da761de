//! SSD1306 opcodes and the fixed power-up command sequence.

/// Length of the power-up command list produced by [`init_sequence`].
pub const INIT_SEQUENCE_LEN: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instruction {
    /// Memory Addressing Mode (20h) - Followed by the mode byte
    MemoryMode = 0x20,
    /// Column Address (21h) - Followed by start and end column
    ColumnAddress = 0x21,
    /// Page Address (22h) - Followed by start and end page
    PageAddress = 0x22,

    /// Right Horizontal Scroll (26h)
    RightHorizontalScroll = 0x26,
    /// Left Horizontal Scroll (27h)
    LeftHorizontalScroll = 0x27,
    /// Vertical and Right Horizontal Scroll (29h)
    VerticalRightHorizontalScroll = 0x29,
    /// Vertical and Left Horizontal Scroll (2Ah)
    VerticalLeftHorizontalScroll = 0x2A,
    /// Deactivate Scroll (2Eh)
    DeactivateScroll = 0x2E,
    /// Activate Scroll (2Fh)
    ActivateScroll = 0x2F,

    /// Display Start Line (40h) - Low six bits select the line
    SetStartLine = 0x40,

    /// Contrast Control (81h) - Followed by the contrast byte
    SetContrast = 0x81,
    /// Charge Pump Setting (8Dh) - Followed by enable/disable byte
    ChargePump = 0x8D,

    /// Segment Re-map (A0h) - Bit 0 maps column 127 to SEG0
    SegmentRemap = 0xA0,
    /// Vertical Scroll Area (A3h) - Followed by fixed rows and scroll rows
    SetVerticalScrollArea = 0xA3,
    /// Entire Display On, resume to RAM content (A4h)
    DisplayAllOnResume = 0xA4,
    /// Normal Display (A6h)
    NormalDisplay = 0xA6,
    /// Inverse Display (A7h)
    InvertDisplay = 0xA7,
    /// Multiplex Ratio (A8h) - Followed by rows - 1
    SetMultiplex = 0xA8,
    /// Display Off (AEh) - Sleep mode
    DisplayOff = 0xAE,
    /// Display On (AFh)
    DisplayOn = 0xAF,

    /// COM Output Scan Direction, remapped (C8h)
    ComScanDecrement = 0xC8,

    /// Display Offset (D3h) - Followed by vertical shift
    SetDisplayOffset = 0xD3,
    /// Display Clock Divide Ratio / Oscillator Frequency (D5h)
    SetDisplayClockDiv = 0xD5,
    /// Pre-charge Period (D9h)
    SetPrecharge = 0xD9,
    /// COM Pins Hardware Configuration (DAh)
    SetComPins = 0xDA,
    /// VCOMH Deselect Level (DBh)
    SetVcomDetect = 0xDB,
}

impl From<Instruction> for u8 {
    fn from(instruction: Instruction) -> Self {
        instruction as u8
    }
}

/// How the panel's drive voltage is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VccMode {
    /// Panel voltage is supplied externally.
    External,
    /// Panel voltage is stepped up from 3.3 V by the on-chip charge pump.
    #[default]
    SwitchCap,
}

impl VccMode {
    pub fn charge_pump(self) -> u8 {
        match self {
            VccMode::External => 0x10,
            VccMode::SwitchCap => 0x14,
        }
    }

    pub fn precharge(self) -> u8 {
        match self {
            VccMode::External => 0x22,
            VccMode::SwitchCap => 0xF1,
        }
    }
}

/// COM pin configuration and default contrast for a panel geometry.
pub fn panel_tuning(width: u8, height: u8, vcc: VccMode) -> (u8, u8) {
    let external = vcc == VccMode::External;
    match (width, height) {
        (128, 64) => (0x12, if external { 0x9F } else { 0xCF }),
        (96, 16) => (0x02, if external { 0x10 } else { 0xAF }),
        _ => (0x02, 0x8F),
    }
}

/// Build the power-up command list. The opcode order is fixed by the
/// controller and must not be rearranged.
pub fn init_sequence(height: u8, vcc: VccMode, com_pins: u8, contrast: u8) -> [u8; INIT_SEQUENCE_LEN] {
    use Instruction::*;

    [
        DisplayOff as u8,
        SetDisplayClockDiv as u8,
        0x80, // suggested ratio
        SetMultiplex as u8,
        height.wrapping_sub(1),
        SetDisplayOffset as u8,
        0x00,
        SetStartLine as u8, // line 0
        ChargePump as u8,
        vcc.charge_pump(),
        MemoryMode as u8,
        0x00, // horizontal addressing
        SegmentRemap as u8 | 0x01,
        ComScanDecrement as u8,
        SetComPins as u8,
        com_pins,
        SetContrast as u8,
        contrast,
        SetPrecharge as u8,
        vcc.precharge(),
        SetVcomDetect as u8,
        0x40,
        DisplayAllOnResume as u8,
        NormalDisplay as u8,
        DeactivateScroll as u8,
        DisplayOn as u8,
    ]
}
