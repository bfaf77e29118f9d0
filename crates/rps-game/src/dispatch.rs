use rps_classify::Label;
use rps_link::SerialLink;

/// Fire-and-forget sink for actuator commands. Delivery assurance lives
/// behind the implementation; controllers never wait on it.
pub trait Dispatcher: Send {
    fn dispatch(&mut self, command: u8);
}

impl Dispatcher for SerialLink {
    fn dispatch(&mut self, command: u8) {
        self.write_byte(command);
    }
}

/// Command byte for a detected gesture. The byte names the counter-move
/// the actuator should play, not the gesture itself: rock is answered
/// with paper ('P'), scissors with rock ('R'), paper with scissors ('S').
pub fn counter_command(label: Label) -> u8 {
    match label {
        Label::Rock => b'P',
        Label::Scissors => b'R',
        Label::Paper => b'S',
    }
}
