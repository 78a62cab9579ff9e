//! Controller input.
//!
//! Inputs come from a [ControllerSource], which the host fills from its own input
//! events. [Joypad::poll] latches a snapshot per port, so button edges are computed
//! between consecutive polls.

use std::{cell::RefCell, fmt, rc::Rc};

use bitflags::bitflags;
use tracing::info;

bitflags! {
    /// Controller buttons, as laid out in the controller status word.
    #[derive(Default)]
    pub struct JoypadButtons: u16 {
        const A       = 0x8000;
        const B       = 0x4000;
        const Z       = 0x2000;
        const START   = 0x1000;
        const D_UP    = 0x0800;
        const D_DOWN  = 0x0400;
        const D_LEFT  = 0x0200;
        const D_RIGHT = 0x0100;
        const L       = 0x0020;
        const R       = 0x0010;
        const C_UP    = 0x0008;
        const C_DOWN  = 0x0004;
        const C_LEFT  = 0x0002;
        const C_RIGHT = 0x0001;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoypadInputs {
    pub btn: JoypadButtons,
    pub stick_x: i8,
    pub stick_y: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoypadPort {
    Port1 = 0,
    Port2 = 1,
    Port3 = 2,
    Port4 = 3,
}

pub const NUM_PORTS: usize = 4;

/// Supplies the current controller state.
pub trait ControllerSource: fmt::Debug {
    /// The state of the controller in `port`, or None if nothing is plugged in.
    fn read(&self, port: JoypadPort) -> Option<JoypadInputs>;
}

/// A controller on port 1 whose state is set by the host.
#[derive(Debug, Clone, Default)]
pub struct SharedController(Rc<RefCell<JoypadInputs>>);

impl SharedController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, inputs: JoypadInputs) {
        *self.0.borrow_mut() = inputs;
    }

    pub fn get(&self) -> JoypadInputs {
        *self.0.borrow()
    }
}

impl ControllerSource for SharedController {
    fn read(&self, port: JoypadPort) -> Option<JoypadInputs> {
        match port {
            JoypadPort::Port1 => Some(self.get()),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Joypad {
    source: Box<dyn ControllerSource>,
    current: [JoypadInputs; NUM_PORTS],
    previous: [JoypadInputs; NUM_PORTS],
}

impl Joypad {
    pub fn init(source: Box<dyn ControllerSource>) -> Self {
        info!("joypad: init");
        Self {
            source,
            current: Default::default(),
            previous: Default::default(),
        }
    }

    /// Latches the current state of every port.
    pub fn poll(&mut self) {
        self.previous = self.current;
        for (i, port) in [
            JoypadPort::Port1,
            JoypadPort::Port2,
            JoypadPort::Port3,
            JoypadPort::Port4,
        ]
        .into_iter()
        .enumerate()
        {
            self.current[i] = self.source.read(port).unwrap_or_default();
        }
    }

    pub fn get_inputs(&self, port: JoypadPort) -> JoypadInputs {
        self.current[port as usize]
    }

    /// Buttons that went down between the last two polls.
    pub fn get_buttons_pressed(&self, port: JoypadPort) -> JoypadButtons {
        self.current[port as usize].btn & !self.previous[port as usize].btn
    }

    pub fn get_buttons_held(&self, port: JoypadPort) -> JoypadButtons {
        self.current[port as usize].btn
    }

    pub fn close(&mut self) {
        info!("joypad: close");
        self.current = Default::default();
        self.previous = Default::default();
    }
}
