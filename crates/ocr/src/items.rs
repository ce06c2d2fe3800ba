use std::collections::HashSet;
use std::sync::OnceLock;

use factura_core::{EngineConfig, LineItem};
use regex::Regex;

use crate::canonical::Canonicalizer;
use crate::types::{Candidate, Classification, Line};

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Quantity tokens open the line: a digit run with a two-place decimal or
// comma separator. Prices are `$`-prefixed or bare two-decimal amounts.
re!(re_quantity_lead, r"^(\d+[,.]\d{2})");
re!(re_price, r"\$(\d+\.\d{2})");
re!(re_bare_price, r"(\d+\.\d{2})");
re!(re_numeric_fragment, r"^\d+[,.]\d{2}");

/// Keywords that mark the item-table header row.
const TABLE_HEADER_KEYWORDS: &[&str] = &["qty", "quantity", "product", "tooth", "item"];

/// Domain vocabulary a line must touch to count as a product-line candidate.
const PRODUCT_KEYWORDS: &[&str] = &[
    "process", "fud", "lrpd", "urpd", "framework", "wax", "rim", "teeth", "set", "up", "lower",
    "upper", "finish", "id", "tag", "at", "oe", "acrylic",
];

/// Header/footer phrases that disqualify a line from being a product line.
const SKIP_HEADER_PHRASES: &[&str] =
    &["product id", "qty", "extended", "invoice subtotal", "amount due", "balance due"];

/// Single-word fragments that signal a continuation line, not a product.
const PARTIAL_INDICATORS: &[&str] =
    &["to", "up", "process", "upper", "lower", "cast", "partial", "framework", "finish"];

// ── Token shape helpers ───────────────────────────────────────────────────────

fn leading_quantity(text: &str) -> Option<String> {
    re_quantity_lead()
        .captures(text.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace(',', "."))
}

fn embedded_price(text: &str) -> Option<String> {
    re_price()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_numeric_fragment(word: &str) -> bool {
    word.starts_with('$') || re_numeric_fragment().is_match(word)
}

/// The non-numeric tokens of a line, i.e. the product description residue.
fn product_words<'a>(line: &'a Line, extra_skip: &[&str]) -> Vec<&'a str> {
    line.tokens
        .iter()
        .map(|t| t.text.as_str())
        .filter(|w| !w.is_empty() && !is_numeric_fragment(w))
        .filter(|w| !extra_skip.contains(&w.to_lowercase().as_str()))
        .collect()
}

fn is_partial_fragment(text: &str, max_words: usize) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.len() <= max_words
        && PARTIAL_INDICATORS
            .iter()
            .any(|ind| text.to_lowercase().contains(ind))
}

// ── Table bounds ──────────────────────────────────────────────────────────────

/// Locate the item-table region. Tier 1: a header row with table keywords
/// and an "extended amount"/"total" end marker. Tier 2: the first line with
/// both a quantity-shaped and a price-shaped token. Tier 3: the first line
/// with any currency amount.
fn table_bounds(lines: &[Line]) -> Option<(usize, usize)> {
    let mut start = None;
    let mut end = lines.len();
    for (i, line) in lines.iter().enumerate() {
        let text = line.text().to_lowercase();
        if TABLE_HEADER_KEYWORDS.iter().any(|k| text.contains(k)) {
            start = Some(i);
        }
        if text.contains("extended amount") || text.contains("total") {
            end = i;
            break;
        }
    }
    if start.is_none() {
        start = lines[..end].iter().position(|l| {
            let text = l.text();
            leading_quantity(&text).is_some() && re_bare_price().is_match(&text)
        });
        if start.is_some() {
            tracing::debug!("table start inferred from quantity+price content");
        }
    }
    if start.is_none() {
        start = lines[..end]
            .iter()
            .position(|l| embedded_price(&l.text()).is_some());
        if start.is_some() {
            tracing::debug!("table start inferred from first currency amount");
        }
    }
    let start = start?;
    if start >= end {
        return None;
    }
    Some((start, end))
}

// ── Candidate selection & classification ──────────────────────────────────────

fn classify(line: &Line) -> Candidate {
    let text = line.text();
    let quantity = leading_quantity(&text);
    let price = embedded_price(&text);
    let classification = match (&quantity, &price) {
        (Some(_), Some(_)) => Classification::Complete,
        (Some(_), None) => Classification::QuantityOnly,
        (None, Some(_)) => Classification::PriceOnly,
        (None, None) => Classification::ProductOnly,
    };
    Candidate { line: line.clone(), classification, quantity, price }
}

fn select_candidates(region: &[Line]) -> Vec<Candidate> {
    region
        .iter()
        .filter(|line| {
            let text = line.text().to_lowercase();
            text.trim().len() > 3
                && PRODUCT_KEYWORDS.iter().any(|k| text.contains(k))
                && !SKIP_HEADER_PHRASES.iter().any(|h| text.contains(h))
        })
        .map(classify)
        .collect()
}

// ── Output accumulation with the dedup guarantee ──────────────────────────────

struct ItemSink {
    items: Vec<LineItem>,
    /// Source positions already consumed; paired lines key on both.
    seen_positions: HashSet<(i32, i32)>,
}

impl ItemSink {
    fn new() -> Self {
        Self { items: Vec::new(), seen_positions: HashSet::new() }
    }

    fn consumed(&self, y: i32) -> bool {
        self.seen_positions.iter().any(|(a, b)| *a == y || *b == y)
    }

    /// Push an item keyed by its source position(s). When `suppress_repeat`
    /// is set, an existing item with the same `(product_number, unit_price)`
    /// blocks the insert — OCR re-emits fragments across adjacent passes.
    fn push(&mut self, key: (i32, i32), item: LineItem, suppress_repeat: bool) -> bool {
        if self.seen_positions.contains(&key) {
            tracing::debug!(y = key.0, "skipping duplicate source position");
            return false;
        }
        if suppress_repeat && self.items.iter().any(|li| li.dedup_key() == item.dedup_key()) {
            tracing::debug!(product = %item.product_number, "suppressing re-emitted item");
            return false;
        }
        self.seen_positions.insert(key);
        self.items.push(item);
        true
    }
}

// ── Reconstruction ────────────────────────────────────────────────────────────

/// Reconstruct the ordered line items of an invoice page.
///
/// Progression: locate table bounds, select keyword candidates, classify by
/// numeric-token shape, resolve complete lines, pair split quantity/price
/// lines, run recovery fallbacks, deduplicate. Every tier always yields a
/// value or moves on; nothing here errors out.
pub fn reconstruct_line_items(
    lines: &[Line],
    cfg: &EngineConfig,
    canon: &Canonicalizer,
) -> Vec<LineItem> {
    let Some((start, end)) = table_bounds(lines) else {
        tracing::debug!("no item-table region found");
        return Vec::new();
    };
    let region = &lines[start..end];
    let candidates = select_candidates(region);
    let mut sink = ItemSink::new();

    // Stage 4: lines carrying both quantity and price resolve directly.
    for cand in &candidates {
        if cand.classification != Classification::Complete {
            continue;
        }
        resolve_complete(cand, region, cfg, canon, &mut sink, false);
    }

    // Stage 5: pair split quantity-only lines with nearby price-only lines.
    pair_split_lines(&candidates, cfg, canon, &mut sink);

    // Stage 6a: candidates with embedded quantity+price the earlier passes
    // filtered away (short product text, continuation heuristics).
    for cand in &candidates {
        if cand.classification != Classification::Complete || sink.consumed(cand.line.y) {
            continue;
        }
        resolve_complete(cand, region, cfg, canon, &mut sink, true);
    }

    // Stage 6b: product-keyword lines with no price of their own borrow the
    // nearest subsequent price in the region.
    for cand in &candidates {
        if cand.classification != Classification::ProductOnly || sink.consumed(cand.line.y) {
            continue;
        }
        if is_continuation(cand, &candidates, cfg) {
            continue;
        }
        resolve_product_only(cand, region, canon, &mut sink);
    }

    // Stage 6c: leftover price-only candidates default their quantity.
    for cand in &candidates {
        if cand.classification != Classification::PriceOnly || sink.consumed(cand.line.y) {
            continue;
        }
        resolve_price_only(&cand.line, cand.price.as_deref(), region, cfg, canon, &["|"], &mut sink);
    }

    // Stage 6d: price-bearing region lines the keyword filter never saw.
    // Column-header bleed is stripped harder here; these lines never proved
    // themselves with a product keyword.
    for line in region {
        if sink.consumed(line.y) {
            continue;
        }
        if let Some(price) = embedded_price(&line.text()) {
            resolve_price_only(
                line,
                Some(&price),
                region,
                cfg,
                canon,
                &["|", "tooth", "product", "id"],
                &mut sink,
            );
        }
    }

    sink.items
}

/// A line sitting within `continuation_distance_px` of another candidate is
/// a wrapped continuation of that candidate, not a row of its own.
fn is_continuation(cand: &Candidate, candidates: &[Candidate], cfg: &EngineConfig) -> bool {
    candidates.iter().any(|other| {
        other.line.y != cand.line.y
            && (other.line.y - cand.line.y).abs() <= cfg.continuation_distance_px
    })
}

fn resolve_complete(
    cand: &Candidate,
    region: &[Line],
    cfg: &EngineConfig,
    canon: &Canonicalizer,
    sink: &mut ItemSink,
    lenient: bool,
) {
    let (Some(quantity), Some(price)) = (cand.quantity.clone(), cand.price.clone()) else {
        return;
    };

    let mut words: Vec<String> = product_words(&cand.line, &[])
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut product_text = words.join(" ").trim().to_string();

    // Thin residue: borrow description tokens from a neighboring line.
    if product_text.len() < 5 {
        if let Some(borrowed) = borrow_words(&cand.line, region, cfg, &[]) {
            words.extend(borrowed);
            product_text = words.join(" ").trim().to_string();
        }
    }
    if product_text.len() < 3 {
        tracing::debug!(y = cand.line.y, "skipping item with no product text");
        return;
    }
    if !lenient && is_partial_fragment(&product_text, 1) {
        tracing::debug!(y = cand.line.y, text = %product_text, "skipping partial fragment");
        return;
    }

    let (product_number, product_name) = canon.resolve(&product_text);
    sink.push(
        (cand.line.y, cand.line.y),
        LineItem {
            product_number,
            product_name,
            quantity,
            unit_price: price.clone(),
            line_item_total: price,
        },
        lenient,
    );
}

fn pair_split_lines(
    candidates: &[Candidate],
    cfg: &EngineConfig,
    canon: &Canonicalizer,
    sink: &mut ItemSink,
) {
    let price_lines: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.classification == Classification::PriceOnly)
        .collect();

    // Longer lines claim contested price evidence first; the stable sort
    // keeps document order between equals.
    let mut quantity_lines: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.classification == Classification::QuantityOnly)
        .collect();
    quantity_lines.sort_by_key(|c| std::cmp::Reverse(c.line.text().len()));

    for q in quantity_lines {
        let q_words: HashSet<String> = q
            .line
            .tokens
            .iter()
            .map(|t| t.text.to_lowercase())
            .collect();

        let mut best: Option<&Candidate> = None;
        let mut best_distance = i32::MAX;
        for p in &price_lines {
            if sink.consumed(p.line.y) {
                continue;
            }
            let distance = (p.line.y - q.line.y).abs();
            if distance > cfg.pair_distance_px || distance >= best_distance {
                continue;
            }
            let shares_word = p
                .line
                .tokens
                .iter()
                .any(|t| q_words.contains(&t.text.to_lowercase()));
            if shares_word || distance <= cfg.near_pair_distance_px {
                best = Some(p);
                best_distance = distance;
            }
        }
        let Some(p) = best else { continue };

        // Combine both lines' non-numeric tokens. Column-header bleed on the
        // quantity side ("teeth", pipes) is dropped.
        let mut words = product_words(&q.line, &["|", "teeth", "tooth"]);
        words.extend(product_words(&p.line, &[]));
        let product_text = words.join(" ").trim().to_string();

        if product_text.len() < 5 || is_partial_fragment(&product_text, 2) {
            continue;
        }
        let (quantity, price) = match (q.quantity.clone(), p.price.clone()) {
            (Some(quantity), Some(price)) => (quantity, price),
            _ => continue,
        };
        let (product_number, product_name) = canon.resolve(&product_text);
        sink.push(
            (q.line.y, p.line.y),
            LineItem {
                product_number,
                product_name,
                quantity,
                unit_price: price.clone(),
                line_item_total: price,
            },
            false,
        );
    }
}

fn resolve_product_only(
    cand: &Candidate,
    region: &[Line],
    canon: &Canonicalizer,
    sink: &mut ItemSink,
) {
    // Borrow the nearest subsequent price in the region, falling back to the
    // first price anywhere in it.
    let price = region
        .iter()
        .filter(|l| l.y >= cand.line.y)
        .find_map(|l| embedded_price(&l.text()))
        .or_else(|| region.iter().find_map(|l| embedded_price(&l.text())));
    let Some(price) = price else { return };

    let generic = [
        "|", "to", "up", "upper", "lower", "cast", "partial", "framework", "wax", "try", "in",
        "of", "for", "set", "teeth", "product", "id",
    ];
    let words = product_words(&cand.line, &generic);
    let product_text = words.join(" ").trim().to_string();

    if product_text.len() < 5 {
        return;
    }
    if product_text.starts_with('|') || product_text.starts_with("to ") || product_text.starts_with("up ")
    {
        return;
    }
    if has_repeated_phrase(&product_text) {
        return;
    }

    let (product_number, product_name) = canon.resolve(&product_text);
    sink.push(
        (cand.line.y, cand.line.y),
        LineItem {
            product_number,
            product_name,
            quantity: "1".to_string(),
            unit_price: price.clone(),
            line_item_total: price,
        },
        true,
    );
}

#[allow(clippy::too_many_arguments)]
fn resolve_price_only(
    line: &Line,
    price: Option<&str>,
    region: &[Line],
    cfg: &EngineConfig,
    canon: &Canonicalizer,
    word_skip: &[&str],
    sink: &mut ItemSink,
) {
    let Some(price) = price.map(str::to_string) else { return };

    // Quantity evidence from a nearby line, else the defined default.
    let quantity = region
        .iter()
        .filter(|l| (l.y - line.y).abs() <= cfg.borrow_distance_px)
        .find_map(|l| leading_quantity(&l.text()))
        .unwrap_or_else(|| "1".to_string());

    let mut words: Vec<String> = product_words(line, word_skip)
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut product_text = words.join(" ").trim().to_string();

    // Longest nearby description wins when this line carries none itself.
    if product_text.len() < 5 {
        let mut best = String::new();
        for nearby in region
            .iter()
            .filter(|l| l.y != line.y && (l.y - line.y).abs() <= cfg.borrow_distance_px)
        {
            let text = product_words(nearby, word_skip).join(" ");
            if text.trim().len() > best.len() {
                best = text.trim().to_string();
            }
        }
        if !best.is_empty() {
            words.push(best);
            product_text = words.join(" ").trim().to_string();
        }
    }
    if product_text.len() < 3 {
        return;
    }
    let skip_words = ["extended", "invoice", "subtotal", "total", "amount due", "balance due"];
    if skip_words.iter().any(|w| product_text.to_lowercase().contains(w)) {
        return;
    }

    let (product_number, product_name) = canon.resolve(&product_text);
    sink.push(
        (line.y, line.y),
        LineItem {
            product_number,
            product_name,
            quantity,
            unit_price: price.clone(),
            line_item_total: price,
        },
        true,
    );
}

/// Repeated leading words ("Set-up FUD Set-up FUD") are OCR double-reads.
fn has_repeated_phrase(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() >= 2 && words[0] == words[1] {
        return true;
    }
    words.len() >= 4 && words[0] == words[2] && words[1] == words[3]
}

fn borrow_words(
    line: &Line,
    region: &[Line],
    cfg: &EngineConfig,
    extra_skip: &[&str],
) -> Option<Vec<String>> {
    region
        .iter()
        .filter(|l| l.y != line.y && (l.y - line.y).abs() <= cfg.borrow_distance_px)
        .map(|l| {
            product_words(l, extra_skip)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .find(|words| !words.is_empty())
}
