//! Box-drawing glyphs used by the chart

/// Separator between the axis labels and the plot area
pub const AXIS: &str = " ┤";
/// Tick marking the top of a contributor block
pub const RIGHT_AXIS: char = '├';
pub const HORIZONTAL: char = '─';
pub const VERTICAL: char = '│';
pub const FALL_THEN_FLAT: char = '╰';
pub const RISE_THEN_FLAT: char = '╭';
pub const FLAT_THEN_FALL: char = '╮';
pub const FLAT_THEN_RISE: char = '╯';
