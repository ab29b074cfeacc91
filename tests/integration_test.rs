//! Integration tests against small, programmatically-built MDX/MDD fixtures.
//!
//! No real `.mdx`/`.mdd` file ships with this crate, so these fixtures encode
//! the container format by hand (v1, UTF-8, raw/uncompressed blocks) rather than
//! round-tripping through an encoder this crate doesn't provide.

use mdict_reader::{MddReader, MdxReader, WordHit, WordQuery};

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn push_nul_text(buf: &mut Vec<u8>, text: &str) {
    buf.extend_from_slice(text.as_bytes());
    buf.push(0);
}

/// Frames `payload` as a single uncompressed (tag `0`) v1 block, as every block
/// body in this format is framed regardless of section.
fn frame_raw_block(payload: &[u8]) -> Vec<u8> {
    let mut block = vec![0u8]; // compression tag: raw
    block.extend_from_slice(payload);
    block
}

/// Builds a v1, UTF-8, unencrypted, uncompressed dictionary with the given
/// `root` element name and `(key, payload_bytes)` entries, all placed in a
/// single keyword block and a single record block. `text_records` controls
/// whether each record gets a trailing NUL (real `.mdx` text records are
/// NUL-delimited so `read_nul_text` can recover them by offset alone;
/// `.mdd` resources have no delimiter and are read back by byte span instead).
fn build_fixture(root: &str, title: &str, entries: &[(&str, &[u8])], text_records: bool) -> Vec<u8> {
    let mut file = Vec::new();

    let header_xml = format!(
        "<{root} GeneratedByEngineVersion=\"1.2\" Encrypted=\"0\" Encoding=\"UTF-8\" \
         StyleSheet=\"1 &lt;b&gt; &lt;/b&gt;\" Title=\"{title}\" />\0"
    );
    let (header_bytes, _, _) = encoding_rs::UTF_16LE.encode(&header_xml);
    push_u32(&mut file, header_bytes.len() as u32);
    file.extend_from_slice(&header_bytes);
    push_u32(&mut file, 0); // unvalidated header checksum

    // --- keyword summary (v1: four 4-byte fields, no trailing checksum) ---
    let num_blocks = 1u32;
    let total_entries = entries.len() as u32;
    push_u32(&mut file, num_blocks);
    push_u32(&mut file, total_entries);
    // placeholder for key_index_comp_len, patched below
    let key_index_comp_len_pos = file.len();
    push_u32(&mut file, 0);
    push_u32(&mut file, 0); // key_blocks_total_len, unused

    // --- key block content (framed) and its block-info entry ---
    let mut key_block_payload = Vec::new();
    let mut offset = 0u32;
    let record_stride = |len: usize| len as u32 + if text_records { 1 } else { 0 };
    for (key, payload) in entries {
        push_u32(&mut key_block_payload, offset);
        push_nul_text(&mut key_block_payload, key);
        offset += record_stride(payload.len());
    }
    let key_block = frame_raw_block(&key_block_payload);

    // v1 `read_short` is a single byte; `read_sized_text` takes a byte count
    // (bytes_per_unit == 1 for UTF-8) with no NUL terminator or unit tail.
    let mut block_info = Vec::new();
    push_u32(&mut block_info, entries.len() as u32);
    let first_word = entries.first().unwrap().0;
    block_info.push(first_word.len() as u8);
    block_info.extend_from_slice(first_word.as_bytes());
    let last_word = entries.last().unwrap().0;
    block_info.push(last_word.len() as u8);
    block_info.extend_from_slice(last_word.as_bytes());
    push_u32(&mut block_info, key_block.len() as u32); // comp_size (incl. tag byte)
    push_u32(&mut block_info, key_block_payload.len() as u32); // decomp_size

    let key_index_comp_len = block_info.len() as u32;
    file[key_index_comp_len_pos..key_index_comp_len_pos + 4]
        .copy_from_slice(&key_index_comp_len.to_be_bytes());
    file.extend_from_slice(&block_info);
    file.extend_from_slice(&key_block);

    // --- record summary (v1: four 4-byte fields) ---
    let mut record_payload = Vec::new();
    for (_, payload) in entries {
        record_payload.extend_from_slice(payload);
        if text_records {
            record_payload.push(0);
        }
    }
    let record_block = frame_raw_block(&record_payload);

    push_u32(&mut file, 1); // num_blocks
    push_u32(&mut file, entries.len() as u32); // num_entries
    push_u32(&mut file, 8); // record_index_len: one (comp_size, decomp_size) pair
    push_u32(&mut file, record_block.len() as u32); // record_blocks_total_len

    push_u32(&mut file, record_block.len() as u32); // comp_size
    push_u32(&mut file, record_payload.len() as u32); // decomp_size
    file.extend_from_slice(&record_block);

    file
}

fn sample_mdx() -> Vec<u8> {
    build_fixture(
        "Dictionary",
        "Test Dict",
        &[
            ("cat", b"a small domesticated carnivore"),
            ("dog", b"a domesticated descendant of the wolf"),
            ("doghouse", b"@@@LINK=dog"),
        ],
        true,
    )
}

fn sample_mdd() -> Vec<u8> {
    build_fixture(
        "Library_Data",
        "Test Resources",
        &[("\\img\\cat.png", b"\x89PNGfakebytes"), ("\\img\\dog.png", b"\x89PNGmorebytes")],
        false,
    )
}

#[test]
fn opens_mdx_fixture_and_reports_attributes() {
    let mdx = MdxReader::open_memory(sample_mdx()).expect("fixture should open");
    assert_eq!(mdx.title(), Some("Test Dict"));
}

#[test]
fn looks_up_exact_word() {
    let mut mdx = MdxReader::open_memory(sample_mdx()).unwrap();
    let def = mdx.get_definition("cat").unwrap();
    assert_eq!(def.as_deref(), Some("a small domesticated carnivore"));
}

#[test]
fn lookup_is_case_insensitive_by_default() {
    let mut mdx = MdxReader::open_memory(sample_mdx()).unwrap();
    let def = mdx.get_definition("CAT").unwrap();
    assert_eq!(def.as_deref(), Some("a small domesticated carnivore"));
}

#[test]
fn missing_word_returns_none() {
    let mut mdx = MdxReader::open_memory(sample_mdx()).unwrap();
    assert_eq!(mdx.get_definition("nonexistent").unwrap(), None);
}

#[test]
fn follows_link_redirect() {
    let mut mdx = MdxReader::open_memory(sample_mdx()).unwrap();
    let def = mdx.get_definition("doghouse").unwrap();
    assert_eq!(
        def.as_deref(),
        Some("a domesticated descendant of the wolf")
    );
}

#[test]
fn get_definition_at_resolves_by_record_offset() {
    let mut mdx = MdxReader::open_memory(sample_mdx()).unwrap();
    let hits = mdx
        .get_word_list(&WordQuery::Exact("cat".into()), 10)
        .unwrap();
    let hit = hits.into_iter().next().expect("cat should be found");
    let def = mdx.get_definition_at(hit.offset).unwrap();
    assert_eq!(def, "a small domesticated carnivore");
}

#[test]
fn prefix_query_finds_both_dog_entries() {
    let mut mdx = MdxReader::open_memory(sample_mdx()).unwrap();
    let hits = mdx
        .get_word_list(&WordQuery::Prefix("dog".into()), 10)
        .unwrap();
    let words: Vec<&str> = hits.iter().map(|h| h.word.as_str()).collect();
    assert!(words.contains(&"dog"));
    assert!(words.contains(&"doghouse"));
}

#[test]
fn prefix_query_pages_through_trail_without_duplicates_or_gaps() {
    let mut mdx = MdxReader::open_memory(sample_mdx()).unwrap();
    let query = WordQuery::Prefix("dog".into());

    let (mut all_hits, mut trail) = mdx.get_word_list_page(&query, 1, None).unwrap();
    assert_eq!(all_hits.len(), 1);
    assert!(trail.is_some(), "a second page should remain");

    loop {
        let Some(t) = trail else { break };
        let (page, next_trail) = mdx.get_word_list_page(&query, 1, Some(t)).unwrap();
        all_hits.extend(page);
        trail = next_trail;
    }

    let words: Vec<&str> = all_hits.iter().map(|h: &WordHit| h.word.as_str()).collect();
    assert_eq!(words, vec!["dog", "doghouse"], "pages must be disjoint, in order, and exhaustive");
}

#[test]
fn wildcard_query_matches_glob() {
    let mut mdx = MdxReader::open_memory(sample_mdx()).unwrap();
    let hits = mdx
        .get_word_list(&WordQuery::Wildcard("do?".into()), 10)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].word, "dog");
}

#[test]
fn opens_mdd_fixture_and_locates_resource() {
    let mut mdd = MddReader::open_memory(sample_mdd()).unwrap();
    let data = mdd.get_resource("\\img\\cat.png").unwrap();
    assert_eq!(data.as_deref(), Some(&b"\x89PNGfakebytes"[..]));
}

#[test]
fn mdd_resource_path_normalizes_forward_slashes() {
    let mut mdd = MddReader::open_memory(sample_mdd()).unwrap();
    let data = mdd.get_resource("img/dog.png").unwrap();
    assert_eq!(data.as_deref(), Some(&b"\x89PNGmorebytes"[..]));
}

#[test]
fn mdd_missing_resource_returns_none() {
    let mut mdd = MddReader::open_memory(sample_mdd()).unwrap();
    assert_eq!(mdd.get_resource("\\missing.png").unwrap(), None);
}
