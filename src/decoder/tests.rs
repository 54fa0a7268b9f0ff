// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Decoder tests


use std::io::Write;

use super::*;
use crate::record::UNKNOWN_VALUE;
use crate::source::Source;

use records::Record;

fn decode_all(bytes: &[u8]) -> Vec<Piece> {
    Decoder::new(io::Cursor::new(bytes))
        .collect::<Result<_, _>>()
        .expect("Could not decode")
}

fn input(index: u8) -> Option<Operand> {
    Some(Operand::input(index))
}

fn output(index: u8, value: u64) -> Option<Operand> {
    Some(Operand::output(index, value))
}

#[test]
fn end_to_end_alu() {
    let bytes = Record::new(0x1000, Category::Alu)
        .inputs(&[5, 6])
        .outputs(&[7])
        .values(&[0x2a])
        .encode();
    let pieces = decode_all(&bytes);
    assert_eq!(
        pieces,
        [Piece {
            category: Category::Alu,
            pc: 0x1000,
            branch: None,
            mem: None,
            inputs: [input(5), input(6), None],
            output: output(7, 0x2a),
            is_last_piece: true,
        }]
    );
    assert_eq!(pieces[0].inputs[0].expect("no slot").value, UNKNOWN_VALUE);
}

#[test]
fn alu_without_outputs() {
    let bytes = Record::new(0x40, Category::Alu).inputs(&[1]).encode();
    let pieces = decode_all(&bytes);
    assert_eq!(pieces.len(), 1);
    assert_eq!(pieces[0].output, None);
    assert!(pieces[0].is_last_piece);
}

#[test]
fn alu_with_integer_outputs() {
    let bytes = Record::new(0x40, Category::Alu)
        .inputs(&[1, 2])
        .outputs(&[7, 8, 9])
        .values(&[10, 11, 12])
        .encode();
    let pieces = decode_all(&bytes);
    assert_eq!(pieces.len(), 3);
    for (i, piece) in pieces.iter().enumerate() {
        assert_eq!(piece.inputs, [input(1), input(2), None]);
        assert_eq!(piece.output, output(7 + i as u8, 10 + i as u64));
        assert_eq!(piece.is_last_piece, i == 2);
    }
}

#[test]
fn extended_output_with_nonzero_high_half() {
    let bytes = Record::new(0x40, Category::Fp)
        .outputs(&[40])
        .values(&[0x11, 0x22])
        .encode();
    let pieces = decode_all(&bytes);
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0].output, output(40, 0x11));
    assert!(!pieces[0].is_last_piece);
    assert_eq!(pieces[1].output, output(40, 0x22));
    assert!(pieces[1].is_last_piece);
}

#[test]
fn extended_output_with_zero_high_half() {
    // The high half is consumed from the stream even though it contributes
    // no piece; the following record must still decode correctly.
    let mut bytes = Record::new(0x40, Category::Fp)
        .outputs(&[40])
        .values(&[0x11, 0x00])
        .encode();
    Record::new(0x44, Category::Alu)
        .outputs(&[3])
        .values(&[7])
        .encode_into(&mut bytes);

    let pieces = decode_all(&bytes);
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0].pc, 0x40);
    assert_eq!(pieces[0].output, output(40, 0x11));
    assert!(pieces[0].is_last_piece);
    assert_eq!(pieces[1].pc, 0x44);
    assert_eq!(pieces[1].output, output(3, 7));
}

#[test]
fn extended_output_between_integer_outputs() {
    let bytes = Record::new(0x40, Category::Fp)
        .outputs(&[3, 40, 4])
        .values(&[0xa, 0x11, 0x22, 0xb])
        .encode();
    let pieces = decode_all(&bytes);
    let outputs: Vec<_> = pieces.iter().map(|p| p.output).collect();
    assert_eq!(
        outputs,
        [
            output(3, 0xa),
            output(40, 0x11),
            output(40, 0x22),
            output(4, 0xb),
        ]
    );
    assert!(pieces[3].is_last_piece);
}

#[test]
fn store_sizing() {
    let bytes = Record::new(0x80, Category::Store)
        .store(0x5000, 16, false, false)
        .inputs(&[1, 2, 3])
        .encode();
    let pieces = decode_all(&bytes);
    assert_eq!(pieces.len(), 2);

    assert_eq!(
        pieces[0].mem,
        Some(MemAccess {
            addr: 0x5000,
            size: 8
        })
    );
    assert_eq!(pieces[0].inputs, [input(1), input(2), None]);
    assert_eq!(pieces[0].output, None);

    assert_eq!(
        pieces[1].mem,
        Some(MemAccess {
            addr: 0x5008,
            size: 8
        })
    );
    assert_eq!(pieces[1].inputs, [input(1), input(3), None]);
    assert!(pieces[1].is_last_piece);
}

#[test]
fn store_with_register_offset() {
    let bytes = Record::new(0x80, Category::Store)
        .store(0x5000, 16, false, true)
        .inputs(&[1, 2, 3, 4])
        .encode();
    let pieces = decode_all(&bytes);
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0].inputs, [input(1), input(2), input(3)]);
    assert_eq!(pieces[1].inputs, [input(1), input(2), input(4)]);
}

#[test]
fn store_base_update() {
    // A store's only output register is the updated address base.
    let bytes = Record::new(0x80, Category::Store)
        .store(0x5000, 8, true, false)
        .inputs(&[5, 9])
        .outputs(&[5])
        .values(&[0x5008])
        .encode();
    let pieces = decode_all(&bytes);
    assert_eq!(pieces.len(), 2);

    assert_eq!(pieces[0].category, Category::Store);
    assert_eq!(pieces[0].inputs, [input(5), input(9), None]);
    assert_eq!(
        pieces[0].mem,
        Some(MemAccess {
            addr: 0x5000,
            size: 8
        })
    );

    assert_eq!(pieces[1].category, Category::Alu);
    assert_eq!(pieces[1].inputs, [input(5), None, None]);
    assert_eq!(pieces[1].output, output(5, 0x5008));
    assert_eq!(pieces[1].mem, None);
    assert!(pieces[1].is_last_piece);
}

#[test]
fn load_base_update() {
    let bytes = Record::new(0x90, Category::Load)
        .load(0x6000, 8, true)
        .inputs(&[3])
        .outputs(&[3, 7])
        .values(&[0x6008, 0x42])
        .encode();
    let pieces = decode_all(&bytes);
    assert_eq!(pieces.len(), 2);

    assert_eq!(pieces[0].category, Category::Load);
    assert_eq!(pieces[0].output, output(7, 0x42));
    assert_eq!(
        pieces[0].mem,
        Some(MemAccess {
            addr: 0x6000,
            size: 8
        })
    );
    assert!(!pieces[0].is_last_piece);

    assert_eq!(pieces[1].category, Category::Alu);
    assert_eq!(pieces[1].inputs, [input(3), None, None]);
    assert_eq!(pieces[1].output, output(3, 0x6008));
    assert_eq!(pieces[1].mem, None);
    assert!(pieces[1].is_last_piece);
}

#[test]
fn load_without_base_update_flag() {
    // Same register overlap, but the record does not flag a base update.
    let bytes = Record::new(0x90, Category::Load)
        .load(0x6000, 16, false)
        .inputs(&[3])
        .outputs(&[3, 7])
        .values(&[0x1111, 0x2222])
        .encode();
    let pieces = decode_all(&bytes);
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0].category, Category::Load);
    assert_eq!(pieces[0].output, output(3, 0x1111));
    assert_eq!(pieces[1].category, Category::Load);
    assert_eq!(pieces[1].output, output(7, 0x2222));
    assert_eq!(
        pieces[1].mem,
        Some(MemAccess {
            addr: 0x6008,
            size: 8
        })
    );
}

#[test]
fn indivisible_store_is_fatal() {
    let bytes = Record::new(0x80, Category::Store)
        .store(0x5000, 15, false, false)
        .inputs(&[1, 2, 3])
        .encode();
    let mut decoder = Decoder::new(io::Cursor::new(bytes));
    assert!(matches!(
        decoder.next(),
        Some(Err(Error::IndivisibleStore {
            record: 0,
            mem_size: 15,
            value_regs: 2,
        }))
    ));
    // fused after the fatal error
    assert!(decoder.next().is_none());
}

#[test]
fn truncated_record_is_fatal() {
    let bytes = Record::new(0x1000, Category::Alu)
        .inputs(&[5, 6])
        .outputs(&[7])
        .values(&[0x2a])
        .encode();
    for cut in [4, bytes.len() - 1] {
        let mut decoder = Decoder::new(io::Cursor::new(&bytes[..cut]));
        assert!(matches!(
            decoder.next_piece(),
            Err(Error::Truncated { record: 0 })
        ));
    }
}

#[test]
fn clean_end_of_stream() {
    let mut decoder = Decoder::new(io::Cursor::new(&[][..]));
    assert!(matches!(decoder.next_piece(), Ok(None)));
    assert!(decoder.next().is_none());
}

#[test]
fn not_taken_unconditional_branch_is_fatal() {
    let bytes = Record::new(0x2000, Category::UncondDirectBranch)
        .not_taken()
        .encode();
    let mut decoder = Decoder::new(io::Cursor::new(bytes));
    assert!(matches!(
        decoder.next_piece(),
        Err(Error::NotTakenBranch {
            record: 0,
            category: Category::UncondDirectBranch,
        })
    ));
}

#[test]
fn unknown_category_is_fatal() {
    let mut bytes = 0x3000u64.to_le_bytes().to_vec();
    bytes.push(42);
    let mut decoder = Decoder::new(io::Cursor::new(bytes));
    assert!(matches!(
        decoder.next_piece(),
        Err(Error::UnknownCategory { record: 0, tag: 42 })
    ));
}

#[test]
fn conditional_branch_fall_through() {
    let bytes = Record::new(0x2000, Category::CondBranch)
        .not_taken()
        .inputs(&[4])
        .encode();
    let pieces = decode_all(&bytes);
    assert_eq!(
        pieces[0].branch,
        Some(Branch {
            taken: false,
            target: 0x2004
        })
    );
}

#[test]
fn taken_branches_carry_their_target() {
    let mut bytes = Record::new(0x2000, Category::CondBranch)
        .taken(0x2800)
        .inputs(&[4])
        .encode();
    Record::new(0x2800, Category::Return)
        .taken(0x1234)
        .inputs(&[1])
        .encode_into(&mut bytes);

    let pieces = decode_all(&bytes);
    assert_eq!(
        pieces[0].branch,
        Some(Branch {
            taken: true,
            target: 0x2800
        })
    );
    assert_eq!(pieces[1].category, Category::Return);
    assert_eq!(
        pieces[1].branch,
        Some(Branch {
            taken: true,
            target: 0x1234
        })
    );
}

#[test]
fn records_are_counted() {
    let mut bytes = Record::new(0x40, Category::Alu).encode();
    Record::new(0x44, Category::Alu).encode_into(&mut bytes);
    let mut decoder = Decoder::new(io::Cursor::new(bytes));
    for piece in decoder.by_ref() {
        piece.expect("Could not decode");
    }
    assert_eq!(decoder.records(), 2);
}

#[test]
fn stream_transparency() {
    let mut bytes = Record::new(0x1000, Category::Alu)
        .inputs(&[5, 6])
        .outputs(&[7])
        .values(&[0x2a])
        .encode();
    Record::new(0x1004, Category::Load)
        .load(0x6000, 8, true)
        .inputs(&[3])
        .outputs(&[3, 7])
        .values(&[0x6008, 0x42])
        .encode_into(&mut bytes);

    let gzipped = {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&bytes).expect("Could not compress");
        encoder.finish().expect("Could not finish compression")
    };
    let tarred = {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "trace.cbp", bytes.as_slice())
            .expect("Could not append entry");
        builder.into_inner().expect("Could not finish container")
    };
    let tarred_gzipped = {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&tarred).expect("Could not compress");
        encoder.finish().expect("Could not finish compression")
    };

    let mut decoded = Vec::new();
    for content in [&bytes, &gzipped, &tarred_gzipped] {
        let mut file = tempfile::NamedTempFile::new().expect("Could not create temp file");
        file.write_all(content).expect("Could not fill temp file");
        file.flush().expect("Could not flush temp file");

        let source = Source::open(file.path()).expect("Could not open");
        let pieces: Vec<_> = Decoder::new(source)
            .collect::<Result<_, _>>()
            .expect("Could not decode");
        decoded.push(pieces);
    }

    assert_eq!(decoded[0], decoded[1]);
    assert_eq!(decoded[0], decoded[2]);
    assert_eq!(decoded[0].len(), 3);
}
