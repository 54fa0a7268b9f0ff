// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Raw macro-instructions
//!
//! A [`Macro`] is one record as read from the trace, before cracking. It is
//! internal to the decoder: the buffer is owned by a single
//! [`Decoder`][super::Decoder] instance and reset in place for every record,
//! keeping its allocations.

use crate::record::{Category, EXTENDED_BASE};

/// One macro-instruction record, as encoded in the trace
#[derive(Debug)]
pub(super) struct Macro {
    pub pc: u64,
    pub next_pc: u64,
    pub category: Category,
    pub taken: bool,
    pub eff_addr: u64,
    pub mem_size: u8,
    /// Raw base-update flag byte (loads only consult it via detection)
    pub base_update: bool,
    /// Whether a store's address is base+register rather than base+immediate
    pub has_reg_offset: bool,
    pub in_regs: Vec<u8>,
    pub out_regs: Vec<u8>,
    /// Decoded output values in emission order
    ///
    /// One value per integer output, two per extended output (low and high
    /// half), with the base-update value moved to the very end.
    pub out_values: Vec<u64>,
    /// Detected base-update register, if any
    pub base_update_reg: Option<u8>,
}

impl Macro {
    pub fn new() -> Self {
        Self {
            pc: 0,
            next_pc: 0,
            category: Category::Undefined,
            taken: false,
            eff_addr: 0,
            mem_size: 0,
            base_update: false,
            has_reg_offset: false,
            in_regs: Vec::new(),
            out_regs: Vec::new(),
            out_values: Vec::new(),
            base_update_reg: None,
        }
    }

    /// Reset all fields for the next record, keeping allocations
    pub fn reset(&mut self) {
        self.pc = 0;
        self.next_pc = 0;
        self.category = Category::Undefined;
        self.taken = false;
        self.eff_addr = 0;
        self.mem_size = 0;
        self.base_update = false;
        self.has_reg_offset = false;
        self.in_regs.clear();
        self.out_regs.clear();
        self.out_values.clear();
        self.base_update_reg = None;
    }

    /// Detect the base-update register of a post-increment load/store
    ///
    /// A store names the updated base as its only output register, so a
    /// store with exactly one output register is always a base update. For
    /// loads the base is found as the single general-purpose register
    /// (index below [`EXTENDED_BASE`]) appearing in both the input and the
    /// output register set, accepted only when the record's base-update
    /// flag is also set.
    pub fn detect_base_update(&mut self) {
        if !self.category.is_mem() {
            return;
        }

        if self.category == Category::Store {
            if let [reg] = self.out_regs.as_slice() {
                self.base_update_reg = Some(*reg);
            }
            return;
        }

        if self.out_regs.len() <= 1 {
            return;
        }

        let gpr = |regs: &[u8]| {
            let mut regs: Vec<u8> = regs.iter().copied().filter(|&r| r < EXTENDED_BASE).collect();
            regs.sort_unstable();
            regs
        };
        let src = gpr(&self.in_regs);
        let dst = gpr(&self.out_regs);

        let mut overlap = None;
        let (mut i, mut j) = (0, 0);
        while i < src.len() && j < dst.len() {
            match src[i].cmp(&dst[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    if overlap.replace(src[i]).is_some() {
                        // more than one overlapping register: ambiguous
                        return;
                    }
                    i += 1;
                    j += 1;
                }
            }
        }

        if self.base_update {
            self.base_update_reg = overlap;
        }
    }
}
