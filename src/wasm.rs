//! WebAssembly bindings for the LC-3 VM.
//!
//! This module provides JavaScript-friendly wrappers around the core machine.
//! Console I/O goes through an in-memory buffer: the page pushes keystrokes
//! in and drains output after each run.

use wasm_bindgen::prelude::*;
use crate::{BufferConsole, Cpu, CpuError, Image};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly VM wrapper.
#[wasm_bindgen]
pub struct WasmVm {
    cpu: Cpu,
    console: BufferConsole,
}

#[wasm_bindgen]
impl WasmVm {
    /// Create a new VM in power-on state.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            console: BufferConsole::new(),
        }
    }

    /// Load an object image. Returns the number of words placed.
    #[wasm_bindgen]
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<usize, JsError> {
        let image = Image::from_bytes(bytes).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.cpu.load_image(&image))
    }

    /// Queue keyboard input for the guest.
    #[wasm_bindgen]
    pub fn push_input(&mut self, text: &str) {
        self.console.push_input(text.as_bytes());
    }

    /// Execute one instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<(), JsError> {
        self.cpu.step(&mut self.console).map(|_| ()).map_err(to_js)
    }

    /// Run until halt or `max_cycles`. Returns instructions executed.
    ///
    /// Queue input before running: a GETC or IN with nothing queued reads 0xFFFF.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u32, JsError> {
        self.cpu
            .run_limited(u64::from(max_cycles), &mut self.console)
            .map(|n| n as u32)
            .map_err(to_js)
    }

    /// Drain everything the guest has written.
    #[wasm_bindgen]
    pub fn take_output(&mut self) -> String {
        String::from_utf8_lossy(&self.console.take_output()).into_owned()
    }

    /// Reset to power-on state, clearing memory and queued I/O.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.console = BufferConsole::new();
    }

    /// Check if the machine has halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Current program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.pc
    }

    /// R0-R7 followed by PC and COND.
    #[wasm_bindgen]
    pub fn registers(&self) -> js_sys::Uint16Array {
        let regs = &self.cpu.regs;
        let mut snapshot = regs.gpr.to_vec();
        snapshot.push(regs.pc);
        snapshot.push(regs.cond.bits());
        js_sys::Uint16Array::from(&snapshot[..])
    }
}

impl Default for WasmVm {
    fn default() -> Self {
        Self::new()
    }
}

fn to_js(e: CpuError) -> JsError {
    JsError::new(&e.to_string())
}
