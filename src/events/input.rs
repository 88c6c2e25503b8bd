use evdev::{EventType, InputEvent};
use std::fmt;

/// Вид пользовательской активности, распознанной в сыром событии evdev
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    KeyPress,
    Movement,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityKind::KeyPress => write!(f, "нажатие клавиши"),
            ActivityKind::Movement => write!(f, "движение"),
        }
    }
}

/// Классификатор событий: нажатие клавиши или движение за пределами мёртвой зоны
#[derive(Debug, Clone, Copy)]
pub struct ActivityFilter {
    deadzone: i32,
}

impl ActivityFilter {
    pub fn new(deadzone: i32) -> Self {
        Self { deadzone }
    }

    pub fn classify(&self, event_type: EventType, value: i32) -> Option<ActivityKind> {
        match event_type {
            // 1 - нажатие; отпускание (0) и автоповтор (2) не считаются
            EventType::KEY if value == 1 => Some(ActivityKind::KeyPress),
            EventType::RELATIVE | EventType::ABSOLUTE if value.abs() > self.deadzone => {
                Some(ActivityKind::Movement)
            }
            _ => None,
        }
    }

    pub fn classify_event(&self, event: &InputEvent) -> Option<ActivityKind> {
        self.classify(event.event_type(), event.value())
    }
}
