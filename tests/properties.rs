// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! Property tests for the invariants documented in `src/types.rs` and the
//! on-disk codec in `src/format.rs` (spec.md §8).

use proptest::prelude::*;
use webdex::{DocId, Posting, TagBucket, TagFrequencies, TokenEntry};

fn arbitrary_tag_frequencies() -> impl Strategy<Value = TagFrequencies> {
    (0u64..500, 0u64..500, 0u64..500, 0u64..500, 0u64..500, 0u64..500, 0u64..500).prop_map(
        |(h1, h2, h3, title, b, strong, other)| TagFrequencies {
            h1,
            h2,
            h3,
            title,
            b,
            strong,
            other,
        },
    )
}

proptest! {
    /// `TagFrequencies::total` always equals the sum of every individual
    /// bucket, including `other` — the completeness invariant spec.md §3
    /// documents for `TagFrequencies`.
    #[test]
    fn tag_frequencies_total_is_the_sum_of_every_bucket(freqs in arbitrary_tag_frequencies()) {
        let expected = freqs.h1 + freqs.h2 + freqs.h3 + freqs.title + freqs.b + freqs.strong + freqs.other;
        prop_assert_eq!(freqs.total(), expected);
    }

    /// `TagFrequencies::add` accumulates into exactly the named bucket and
    /// leaves every other bucket untouched.
    #[test]
    fn add_only_changes_the_named_bucket(freqs in arbitrary_tag_frequencies(), count in 0u64..1000) {
        for bucket in TagBucket::WEIGHTED.into_iter().chain([TagBucket::Other]) {
            let mut copy = freqs;
            copy.add(bucket, count);
            prop_assert_eq!(copy.get(bucket), freqs.get(bucket) + count);
            for other in TagBucket::WEIGHTED.into_iter().chain([TagBucket::Other]) {
                if other != bucket {
                    prop_assert_eq!(copy.get(other), freqs.get(other));
                }
            }
        }
    }

    /// `Posting::new` always enforces `frequency == tag_frequencies.total()`
    /// (spec.md §3 Posting invariant) regardless of the input distribution.
    #[test]
    fn posting_new_enforces_the_frequency_invariant(freqs in arbitrary_tag_frequencies(), doc_id in 1u32..u32::MAX) {
        let posting = Posting::new(DocId::new(doc_id), freqs);
        prop_assert_eq!(posting.frequency, freqs.total());
    }

    /// Pushing postings onto a `TokenEntry` always keeps `df` equal to the
    /// number of postings stored (spec.md §3 TokenEntry invariant).
    #[test]
    fn token_entry_df_tracks_posting_count(
        doc_ids in proptest::collection::vec(1u32..10_000, 0..50),
        freqs in arbitrary_tag_frequencies(),
    ) {
        let mut entry = TokenEntry::new();
        for id in &doc_ids {
            entry.push(Posting::new(DocId::new(*id), freqs));
        }
        prop_assert_eq!(entry.df, doc_ids.len() as u64);
        prop_assert_eq!(entry.postings.len(), doc_ids.len());
    }

    /// Merging two `TokenEntry`s concatenates postings and sums `df`,
    /// never collapsing or summing postings for the same doc_id (spec.md's
    /// resolution of the posting-merge open question).
    #[test]
    fn token_entry_merge_concatenates_and_sums_df(
        left_ids in proptest::collection::vec(1u32..10_000, 0..20),
        right_ids in proptest::collection::vec(1u32..10_000, 0..20),
        freqs in arbitrary_tag_frequencies(),
    ) {
        let mut left = TokenEntry::new();
        for id in &left_ids {
            left.push(Posting::new(DocId::new(*id), freqs));
        }
        let mut right = TokenEntry::new();
        for id in &right_ids {
            right.push(Posting::new(DocId::new(*id), freqs));
        }

        let total_before = left.df + right.df;
        let postings_before = left.postings.len() + right.postings.len();
        left.merge(right);

        prop_assert_eq!(left.df, total_before);
        prop_assert_eq!(left.postings.len(), postings_before);
    }

    /// Varint round-trips for every `u64`, consuming exactly the bytes it
    /// produced.
    #[test]
    fn varint_round_trips(value in any::<u64>()) {
        let mut buf = Vec::new();
        webdex::format::encode_varint(value, &mut buf);
        let (decoded, consumed) = webdex::format::decode_varint(&buf).unwrap();
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(consumed, buf.len());
    }

    /// A `TokenEntry` with arbitrary postings survives an encode/decode
    /// round trip through the on-disk TLV payload unchanged.
    #[test]
    fn token_entry_codec_round_trips(
        doc_ids in proptest::collection::vec(1u32..10_000, 0..20),
        freqs in arbitrary_tag_frequencies(),
    ) {
        let mut entry = TokenEntry::new();
        for id in &doc_ids {
            entry.push(Posting::new(DocId::new(*id), freqs));
        }

        let encoded = webdex::format::encode_token_entry(&entry);
        let decoded = webdex::format::decode_token_entry(&encoded).unwrap();

        prop_assert_eq!(decoded.df, entry.df);
        prop_assert_eq!(decoded.postings, entry.postings);
    }
}
