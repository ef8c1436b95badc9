//! CMP flags and the JMP/JEQ/JNE control transfers.

use ls8_sim::{Opcode, Vm};

const HLT: u8 = Opcode::Hlt as u8;
const LDI: u8 = Opcode::Ldi as u8;
const JMP: u8 = Opcode::Jmp as u8;
const JEQ: u8 = Opcode::Jeq as u8;
const JNE: u8 = Opcode::Jne as u8;
const CMP: u8 = Opcode::Cmp as u8;

fn run(program: &[u8]) -> Vm<Vec<u8>> {
    let mut vm = Vm::with_output(Vec::new());
    vm.load(program).unwrap();
    vm.run().unwrap();
    vm
}

// r0 and r1 hold the compared values, r2 the branch target; r3 becomes 1
// only when the branch falls through.
fn branch_program(a: u8, b: u8, branch: u8) -> Vec<u8> {
    vec![
        LDI, 0, a, //     0
        LDI, 1, b, //     3
        LDI, 2, 17, //    6
        CMP, 0, 1, //     9
        branch, 2, //     12: taken -> 17, fall through -> 14
        LDI, 3, 1, //     14
        HLT, //           17
    ]
}

#[test]
fn jeq_jumps_when_equal() {
    let vm = run(&branch_program(5, 5, JEQ));
    assert_eq!(vm.register(3), 0);
}

#[test]
fn jeq_falls_through_when_not_equal() {
    let vm = run(&branch_program(5, 6, JEQ));
    assert_eq!(vm.register(3), 1);
}

#[test]
fn jne_jumps_when_not_equal() {
    let vm = run(&branch_program(200, 7, JNE));
    assert_eq!(vm.register(3), 0);
}

#[test]
fn jne_falls_through_when_equal() {
    let vm = run(&branch_program(7, 7, JNE));
    assert_eq!(vm.register(3), 1);
}

#[test]
fn flags_persist_until_the_next_compare() {
    // One CMP feeds two conditional jumps in a row.
    let vm = run(&[
        LDI, 0, 3, //  0
        LDI, 1, 3, //  3
        LDI, 2, 16, // 6: target of the first JEQ
        CMP, 0, 1, //  9
        JEQ, 2, //     12
        HLT, //        14
        0, //          15
        LDI, 2, 21, // 16: second target
        JEQ, 2, //     19: same flags, still taken
        HLT, //        21
    ]);
    assert_eq!(vm.pc(), 22);
}

#[test]
fn jmp_is_unconditional() {
    let vm = run(&[
        LDI, 0, 8, //  0
        JMP, 0, //     3
        LDI, 1, 9, //  5: skipped over
        HLT, //        8
    ]);
    assert_eq!(vm.register(1), 0);
    assert_eq!(vm.pc(), 9);
}
