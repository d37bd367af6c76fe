// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

use super::*;

use alloc::vec;
use alloc::vec::Vec;

fn push_u16(v: &mut Vec<u8>, x: u16) {
    v.extend_from_slice(&x.to_le_bytes());
}

fn push_u32(v: &mut Vec<u8>, x: u32) {
    v.extend_from_slice(&x.to_le_bytes());
}

fn push_u64(v: &mut Vec<u8>, x: u64) {
    v.extend_from_slice(&x.to_le_bytes());
}

fn patch_u32(v: &mut [u8], off: usize, x: u32) {
    v[off..off + 4].copy_from_slice(&x.to_le_bytes());
}

fn patch_u64(v: &mut [u8], off: usize, x: u64) {
    v[off..off + 8].copy_from_slice(&x.to_le_bytes());
}

#[allow(clippy::too_many_arguments)]
fn push_shdr64(
    v: &mut Vec<u8>,
    name: u32,
    stype: u32,
    flags: u64,
    addr: u64,
    offset: u64,
    size: u64,
    link: u32,
    addralign: u64,
    entsize: u64,
) {
    push_u32(v, name);
    push_u32(v, stype);
    push_u64(v, flags);
    push_u64(v, addr);
    push_u64(v, offset);
    push_u64(v, size);
    push_u32(v, link);
    push_u32(v, 0); // sh_info
    push_u64(v, addralign);
    push_u64(v, entsize);
}

fn push_phdr64(v: &mut Vec<u8>, ptype: u32, flags: u32, offset: u64, vaddr: u64, filesz: u64) {
    push_u32(v, ptype);
    push_u32(v, flags);
    push_u64(v, offset);
    push_u64(v, vaddr);
    push_u64(v, vaddr); // p_paddr
    push_u64(v, filesz);
    push_u64(v, filesz); // p_memsz
    push_u64(v, 0x1000); // p_align
}

fn push_sym64(v: &mut Vec<u8>, name: u32, info: u8, shndx: u16, value: u64, size: u64) {
    push_u32(v, name);
    v.push(info);
    v.push(0); // st_other
    push_u16(v, shndx);
    push_u64(v, value);
    push_u64(v, size);
}

// Layout of the synthetic 64-bit little-endian image built by
// build_elf64():
//
//   [0,   64)  file header
//   [64, 176)  program header table, 2 entries
//   [176, 192) .text contents
//   [192, 264) .symtab, 3 entries
//   [264, 281) .strtab  ("\0main\0extern_ref\0")
//   [281, 314) .shstrtab
//   [314, 634) section header table, 5 entries
const ELF64_SHOFF: usize = 314;
const ELF64_SHENTSIZE: usize = 64;
const ELF64_LEN: usize = 634;

fn shdr_off(i: usize) -> usize {
    ELF64_SHOFF + i * ELF64_SHENTSIZE
}

fn build_elf64() -> Vec<u8> {
    let mut v = Vec::new();

    // e_ident
    v.extend_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
    v.extend_from_slice(&[0; 8]);
    push_u16(&mut v, 2); // e_type: ET_EXEC
    push_u16(&mut v, 62); // e_machine: EM_X86_64
    push_u32(&mut v, 1); // e_version
    push_u64(&mut v, 0x401000); // e_entry
    push_u64(&mut v, 64); // e_phoff
    push_u64(&mut v, ELF64_SHOFF as u64); // e_shoff
    push_u32(&mut v, 0); // e_flags
    push_u16(&mut v, 64); // e_ehsize
    push_u16(&mut v, 56); // e_phentsize
    push_u16(&mut v, 2); // e_phnum
    push_u16(&mut v, ELF64_SHENTSIZE as u16); // e_shentsize
    push_u16(&mut v, 5); // e_shnum
    push_u16(&mut v, 4); // e_shstrndx
    assert_eq!(v.len(), 64);

    push_phdr64(&mut v, 1, 0x5, 0, 0x400000, 192);
    push_phdr64(&mut v, 1, 0x6, 192, 0x402000, 122);
    assert_eq!(v.len(), 176);

    v.extend_from_slice(&[0x90; 16]); // .text

    push_sym64(&mut v, 0, 0, 0, 0, 0);
    push_sym64(&mut v, 1, 0x12, 1, 0x401000, 16); // "main"
    push_sym64(&mut v, 6, 0x10, 0, 0, 0); // "extern_ref", undefined
    assert_eq!(v.len(), 264);

    v.extend_from_slice(b"\0main\0extern_ref\0");
    assert_eq!(v.len(), 281);

    v.extend_from_slice(b"\0.text\0.symtab\0.strtab\0.shstrtab\0");
    assert_eq!(v.len(), ELF64_SHOFF);

    push_shdr64(&mut v, 0, 0, 0, 0, 0, 0, 0, 0, 0);
    push_shdr64(&mut v, 1, 1, 0x6, 0x401000, 176, 16, 0, 16, 0); // .text
    push_shdr64(&mut v, 7, 2, 0, 0, 192, 72, 3, 8, 24); // .symtab
    push_shdr64(&mut v, 15, 3, 0, 0, 264, 17, 0, 1, 0); // .strtab
    push_shdr64(&mut v, 23, 3, 0, 0, 281, 33, 0, 1, 0); // .shstrtab
    assert_eq!(v.len(), ELF64_LEN);

    v
}

// Layout of the synthetic 32-bit little-endian image:
//
//   [0,   52)  file header
//   [52,  84)  program header table, 1 entry
//   [84,  92)  .text contents
//   [92, 109)  .shstrtab
//   [109, 229) section header table, 3 entries
fn build_elf32() -> Vec<u8> {
    let mut v = Vec::new();

    v.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
    v.extend_from_slice(&[0; 8]);
    push_u16(&mut v, 2); // e_type
    push_u16(&mut v, 3); // e_machine: EM_386
    push_u32(&mut v, 1); // e_version
    push_u32(&mut v, 0x8048000); // e_entry
    push_u32(&mut v, 52); // e_phoff
    push_u32(&mut v, 109); // e_shoff
    push_u32(&mut v, 0); // e_flags
    push_u16(&mut v, 52); // e_ehsize
    push_u16(&mut v, 32); // e_phentsize
    push_u16(&mut v, 1); // e_phnum
    push_u16(&mut v, 40); // e_shentsize
    push_u16(&mut v, 3); // e_shnum
    push_u16(&mut v, 2); // e_shstrndx
    assert_eq!(v.len(), 52);

    // program header
    push_u32(&mut v, 1); // p_type: PT_LOAD
    push_u32(&mut v, 0); // p_offset
    push_u32(&mut v, 0x8048000); // p_vaddr
    push_u32(&mut v, 0x8048000); // p_paddr
    push_u32(&mut v, 92); // p_filesz
    push_u32(&mut v, 92); // p_memsz
    push_u32(&mut v, 0x5); // p_flags
    push_u32(&mut v, 0x1000); // p_align
    assert_eq!(v.len(), 84);

    v.extend_from_slice(&[0x90; 8]); // .text

    v.extend_from_slice(b"\0.text\0.shstrtab\0");
    assert_eq!(v.len(), 109);

    // section headers: null, .text, .shstrtab
    let shdrs: [[u32; 10]; 3] = [
        [0; 10],
        [1, 1, 0x6, 0x8048000, 84, 8, 0, 0, 4, 0],
        [7, 3, 0, 0, 92, 17, 0, 0, 1, 0],
    ];
    for shdr in shdrs {
        for field in shdr {
            push_u32(&mut v, field);
        }
    }
    assert_eq!(v.len(), 229);

    v
}

#[test]
fn test_not_elf() {
    // Too short to hold the identification block.
    assert_eq!(
        parse(&[0x7f, b'E']).unwrap_err(),
        ParseError {
            stage: Stage::Ident,
            error: FormatError::NotElf,
        }
    );

    // Magic mismatch.
    let mut buf = build_elf64();
    buf[0] = 0x7e;
    assert_eq!(parse(&buf).unwrap_err().error, FormatError::NotElf);
}

#[test]
fn test_unsupported_class_and_encoding() {
    let mut buf = build_elf64();
    buf[4] = 3;
    let err = parse(&buf).unwrap_err();
    assert_eq!(err.stage, Stage::Ident);
    assert_eq!(err.error, FormatError::UnsupportedClass);

    let mut buf = build_elf64();
    buf[5] = 0;
    assert_eq!(parse(&buf).unwrap_err().error, FormatError::UnsupportedEncoding);
}

#[test]
fn test_header_size_mismatch() {
    let mut buf = build_elf64();
    buf[52..54].copy_from_slice(&60u16.to_le_bytes());
    let err = parse(&buf).unwrap_err();
    assert_eq!(err.stage, Stage::Header);
    assert_eq!(err.error, FormatError::Malformed);
}

#[test]
fn test_section_table_out_of_bounds() {
    // Section header table reaching past the end of the buffer is
    // caught when the file header is validated.
    let mut buf = build_elf64();
    let len = buf.len();
    patch_u64(&mut buf, 40, (len + 1) as u64);
    let err = parse(&buf).unwrap_err();
    assert_eq!(err.stage, Stage::Header);
    assert_eq!(err.error, FormatError::Malformed);

    // An individual entry declaring an out-of-bounds byte range is
    // caught during the section table read.
    let mut buf = build_elf64();
    patch_u64(&mut buf, shdr_off(1) + 24, u64::MAX - 8);
    let err = parse(&buf).unwrap_err();
    assert_eq!(err.stage, Stage::Sections);
    assert_eq!(err.error, FormatError::Malformed);
}

#[test]
fn test_elf64_round_trip() {
    let buf = build_elf64();
    let image = parse(&buf).unwrap();

    assert_eq!(image.format.class, ElfClass::Elf64);
    assert_eq!(image.format.encoding, ElfEncoding::LittleEndian);
    assert_eq!(image.header.entry_point, 0x401000);

    // Sections in table order, names resolved.
    let names: Vec<&str> = image.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["", ".text", ".symtab", ".strtab", ".shstrtab"]);

    let text = image.sections.by_name(".text").unwrap();
    assert_eq!(text.address, 0x401000);
    assert_eq!(text.offset, 176);
    assert_eq!(text.size, 16);
    assert_eq!(text.stype, Section::SHT_PROGBITS);
    assert!(text.flags.contains(SectionFlags::ALLOC | SectionFlags::EXECINSTR));
    assert_eq!(text.link, None);

    let symtab = image.sections.by_name(".symtab").unwrap();
    assert_eq!(symtab.link, Some(3));

    // Segments in table order.
    assert_eq!(image.segments.len(), 2);
    assert_eq!(image.segments[0].index, 0);
    assert_eq!(image.segments[0].address, 0x400000);
    assert_eq!(image.segments[0].offset, 0);
    assert_eq!(image.segments[0].size, 192);
    assert_eq!(image.segments[0].ptype, Segment::PT_LOAD);
    assert_eq!(image.segments[0].flags, SegmentFlags::READ | SegmentFlags::EXECUTE);
    assert_eq!(image.segments[1].index, 1);
    assert_eq!(image.segments[1].address, 0x402000);
    assert_eq!(image.segments[1].size, 122);

    // The zero-valued entries ("" and "extern_ref") are filtered.
    assert_eq!(image.symbols.len(), 1);
    let main = &image.symbols["main"];
    assert_eq!(main.name, "main");
    assert_eq!(main.value, 0x401000);
    assert_eq!(main.size, 16);
}

#[test]
fn test_elf32_round_trip() {
    let buf = build_elf32();
    let image = parse(&buf).unwrap();

    assert_eq!(image.format.class, ElfClass::Elf32);
    assert_eq!(image.header.entry_point, 0x8048000);

    let names: Vec<&str> = image.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["", ".text", ".shstrtab"]);

    let text = image.sections.by_name(".text").unwrap();
    assert_eq!(text.address, 0x8048000);
    assert_eq!(text.offset, 84);
    assert_eq!(text.size, 8);

    assert_eq!(image.segments.len(), 1);
    assert_eq!(image.segments[0].address, 0x8048000);
    assert_eq!(image.segments[0].size, 92);

    assert!(image.symbols.is_empty());
}

#[test]
fn test_big_endian_header() {
    // Minimal header-only big-endian image: empty tables are valid
    // and decode to empty sequences.
    let mut v = vec![0x7f, b'E', b'L', b'F', 2, 2, 1, 0];
    v.extend_from_slice(&[0; 8]);
    v.extend_from_slice(&2u16.to_be_bytes()); // e_type
    v.extend_from_slice(&62u16.to_be_bytes()); // e_machine
    v.extend_from_slice(&1u32.to_be_bytes()); // e_version
    v.extend_from_slice(&0x1234u64.to_be_bytes()); // e_entry
    v.extend_from_slice(&[0; 16]); // e_phoff, e_shoff
    v.extend_from_slice(&[0; 4]); // e_flags
    v.extend_from_slice(&64u16.to_be_bytes()); // e_ehsize
    v.extend_from_slice(&[0; 10]); // entry sizes, counts, shstrndx
    assert_eq!(v.len(), 64);

    let image = parse(&v).unwrap();
    assert_eq!(image.format.encoding, ElfEncoding::BigEndian);
    assert_eq!(image.header.entry_point, 0x1234);
    assert!(image.sections.is_empty());
    assert!(image.segments.is_empty());
    assert!(image.symbols.is_empty());
}

#[test]
fn test_section_name_collision() {
    // Rename .strtab (index 3) to ".text": the name-keyed view must
    // return the later-indexed entry, the ordered view keeps both.
    let mut buf = build_elf64();
    patch_u32(&mut buf, shdr_off(3), 1);
    let image = parse(&buf).unwrap();

    assert_eq!(image.sections.len(), 5);
    assert_eq!(image.sections.get(1).unwrap().name, ".text");
    assert_eq!(image.sections.get(3).unwrap().name, ".text");

    let winner = image.sections.by_name(".text").unwrap();
    assert_eq!(winner.stype, Section::SHT_STRTAB);
    assert_eq!(winner.offset, 264);
}

#[test]
fn test_bad_section_name_table_index() {
    let mut buf = build_elf64();
    buf[62..64].copy_from_slice(&9u16.to_le_bytes());
    let err = parse(&buf).unwrap_err();
    assert_eq!(err.stage, Stage::Sections);
    assert_eq!(err.error, FormatError::Malformed);

    // An in-range index naming a non-string-table section is equally
    // unresolvable.
    let mut buf = build_elf64();
    buf[62..64].copy_from_slice(&1u16.to_le_bytes());
    assert_eq!(parse(&buf).unwrap_err().error, FormatError::Malformed);
}

#[test]
fn test_section_name_offset_out_of_bounds() {
    let mut buf = build_elf64();
    patch_u32(&mut buf, shdr_off(1), 1000);
    let err = parse(&buf).unwrap_err();
    assert_eq!(err.stage, Stage::Sections);
    assert_eq!(err.error, FormatError::Malformed);
}

#[test]
fn test_section_link_out_of_range() {
    let mut buf = build_elf64();
    patch_u32(&mut buf, shdr_off(1) + 40, 99);
    let err = parse(&buf).unwrap_err();
    assert_eq!(err.stage, Stage::Sections);
    assert_eq!(err.error, FormatError::Malformed);
}

#[test]
fn test_symtab_strtab_fallback_by_name() {
    // Clear the symbol table's link: pairing falls back to the
    // section literally named ".strtab".
    let mut buf = build_elf64();
    patch_u32(&mut buf, shdr_off(2) + 40, 0);
    let image = parse(&buf).unwrap();
    assert_eq!(image.symbols.len(), 1);
    assert_eq!(image.symbols["main"].value, 0x401000);
}

#[test]
fn test_symtab_size_not_entry_multiple() {
    let mut buf = build_elf64();
    patch_u64(&mut buf, shdr_off(2) + 32, 70);
    let err = parse(&buf).unwrap_err();
    assert_eq!(err.stage, Stage::Symbols);
    assert_eq!(err.error, FormatError::Malformed);
}

#[test]
fn test_truncated_prefixes_never_panic() {
    // Every proper prefix of a valid image must be rejected with an
    // error, never accepted, and never panic.
    let buf = build_elf64();
    for n in 0..buf.len() {
        assert!(parse(&buf[..n]).is_err(), "prefix of length {} accepted", n);
    }
}

#[test]
fn test_parse_is_idempotent() {
    let buf = build_elf64();
    let a = parse(&buf).unwrap();
    let b = parse(&buf).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_file_range_try_from() {
    let range = FileRange::try_from((0u64, 100u64)).unwrap();
    assert_eq!(range.offset_begin, 0);
    assert_eq!(range.offset_end, 100);
    assert_eq!(range.len(), 100);
    assert!(!range.is_empty());

    // Overflowing end offset.
    assert!(FileRange::try_from((usize::MAX as u64, 100u64)).is_err());
}
