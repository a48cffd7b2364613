//! The Uzbekistan public-procurement sources and their sink declarations.

use std::sync::Arc;

use collector_core::{
    DateFormat, HarvestedRecord, ItemFilter, SinkFormat, SinkSpec, SourceConfig,
};
use collector_engine::{FetchDescriptor, ParseError, ParsedItem, SourceProtocol};
use serde_json::{json, Map, Value};

const PAGE_SIZE: u64 = 1000;
const DEFAULT_FROM_DATE: &str = "2022-01-01T00:00:00";

/// Auction lots: list entries without a product breakdown.
struct AuctionLotFilter;

impl ItemFilter for AuctionLotFilter {
    fn accepts(&self, record: &HarvestedRecord) -> bool {
        !record.has_field("product_name")
    }
}

/// Per-lot products, fetched through detail expansion.
struct AuctionProductFilter;

impl ItemFilter for AuctionProductFilter {
    fn accepts(&self, record: &HarvestedRecord) -> bool {
        record.has_field("product_name")
    }
}

/// Completed auctions. Every lot also spawns one child fetch for its
/// products; product records carry the parent's `lot_id`.
pub struct AuctionsSource {
    config: SourceConfig,
}

impl AuctionsSource {
    pub fn new() -> Self {
        Self {
            config: SourceConfig {
                name: "uzbekistan_auctions".to_string(),
                base_url: "https://xarid-api-auction.uzex.uz/Common/GetCompletedDeals"
                    .to_string(),
                page_size: PAGE_SIZE,
                date_required: true,
                date_format: DateFormat::DateTime,
                default_from_date: Some(DEFAULT_FROM_DATE.to_string()),
                default_until_date: None,
                sinks: vec![
                    SinkSpec::new("uzbekistan_auction")
                        .with_formats(vec![SinkFormat::Csv])
                        .with_filter(Arc::new(AuctionLotFilter)),
                    SinkSpec::new("uzbekistan_auction_item")
                        .with_formats(vec![SinkFormat::Csv])
                        .with_filter(Arc::new(AuctionProductFilter)),
                ],
            },
        }
    }
}

impl SourceProtocol for AuctionsSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn parse_page(&self, body: Value) -> Result<Vec<ParsedItem>, ParseError> {
        let Value::Array(items) = body else {
            return Err(ParseError::NotAList);
        };
        let mut parsed = Vec::new();
        for item in items {
            let record = HarvestedRecord::from_value(item).ok_or(ParseError::NotAnObject)?;
            if let Some(lot_id) = record.get("lot_id").cloned() {
                let mut carry = Map::new();
                carry.insert("lot_id".to_string(), lot_id.clone());
                parsed.push(ParsedItem::Detail {
                    descriptor: FetchDescriptor::get(format!(
                        "https://xarid-api-auction.uzex.uz/Common/GetCompletedDealProducts/{lot_id}"
                    )),
                    carry,
                });
            }
            parsed.push(ParsedItem::Record(record));
        }
        Ok(parsed)
    }
}

/// Tender deals. Plain list protocol; the deals table is the incremental
/// main sink, indexed and checkpointed on `deal_date`.
pub struct DealsSource {
    config: SourceConfig,
}

impl DealsSource {
    pub fn new() -> Self {
        Self {
            config: SourceConfig {
                name: "uzbekistan_deals".to_string(),
                base_url: "https://apietender.uzex.uz/api/common/DealsList".to_string(),
                page_size: PAGE_SIZE,
                date_required: true,
                date_format: DateFormat::DateTime,
                default_from_date: Some(DEFAULT_FROM_DATE.to_string()),
                default_until_date: None,
                sinks: vec![SinkSpec::new("uzbekistan_deals")
                    .with_formats(vec![SinkFormat::JsonLines, SinkFormat::Csv])
                    .with_date_column("deal_date")
                    .with_index("deal_date")],
            },
        }
    }
}

impl SourceProtocol for DealsSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }
}

/// Completed shop deals. The extent is split across two entry points,
/// national and shop; each first request paginates independently.
pub struct CompletedDealsSource {
    config: SourceConfig,
}

impl CompletedDealsSource {
    pub fn new() -> Self {
        Self {
            config: SourceConfig {
                name: "uzbekistan_completed_deals".to_string(),
                base_url: "https://xarid-api-shop.uzex.uz/Common/GetCompletedDeals".to_string(),
                page_size: PAGE_SIZE,
                date_required: true,
                date_format: DateFormat::DateTime,
                default_from_date: Some(DEFAULT_FROM_DATE.to_string()),
                default_until_date: None,
                sinks: vec![SinkSpec::new("uzbekistan_completed_deals")
                    .with_formats(vec![SinkFormat::JsonLines, SinkFormat::Csv])
                    .with_date_column("deal_date")
                    .with_index("deal_date")],
            },
        }
    }
}

impl SourceProtocol for CompletedDealsSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn variants(&self) -> Vec<Map<String, Value>> {
        [1, 0]
            .into_iter()
            .map(|national| {
                let mut variant = Map::new();
                variant.insert(
                    "display_on_shop".to_string(),
                    json!(if national == 1 { 0 } else { 1 }),
                );
                variant.insert("display_on_national".to_string(), json!(national));
                variant
            })
            .collect()
    }
}

/// Direct purchases. No date filtering; list entries are only stubs, the
/// full record comes from a per-item detail fetch carrying the list's
/// `total_count` so later runs can compare totals.
pub struct DirectPurchasesSource {
    config: SourceConfig,
}

impl DirectPurchasesSource {
    pub fn new() -> Self {
        Self {
            config: SourceConfig {
                name: "uzbekistan_direct_purchases".to_string(),
                base_url: "https://xarid-api-purchase.uzex.uz/Common/GetDirectPurchases"
                    .to_string(),
                page_size: PAGE_SIZE,
                date_required: false,
                date_format: DateFormat::DateTime,
                default_from_date: Some(DEFAULT_FROM_DATE.to_string()),
                default_until_date: None,
                sinks: vec![SinkSpec::new("uzbekistan_direct_purchases")
                    .with_formats(vec![SinkFormat::Csv])
                    .with_overwrite()],
            },
        }
    }
}

impl SourceProtocol for DirectPurchasesSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn parse_page(&self, body: Value) -> Result<Vec<ParsedItem>, ParseError> {
        let Value::Array(items) = body else {
            return Err(ParseError::NotAList);
        };
        let mut parsed = Vec::new();
        for item in items {
            let record = HarvestedRecord::from_value(item).ok_or(ParseError::NotAnObject)?;
            let Some(id) = record.get("id").cloned() else {
                continue;
            };
            let mut carry = Map::new();
            if let Some(total) = record.get("total_count").cloned() {
                carry.insert("total_count".to_string(), total);
            }
            parsed.push(ParsedItem::Detail {
                descriptor: FetchDescriptor::get(format!(
                    "https://xarid-api-purchase.uzex.uz/Common/GetDirectPurchase/{id}"
                )),
                carry,
            });
        }
        Ok(parsed)
    }
}

pub fn names() -> Vec<&'static str> {
    vec![
        "uzbekistan_auctions",
        "uzbekistan_completed_deals",
        "uzbekistan_deals",
        "uzbekistan_direct_purchases",
    ]
}

pub fn by_name(name: &str) -> Option<Box<dyn SourceProtocol>> {
    match name {
        "uzbekistan_auctions" => Some(Box::new(AuctionsSource::new())),
        "uzbekistan_completed_deals" => Some(Box::new(CompletedDealsSource::new())),
        "uzbekistan_deals" => Some(Box::new(DealsSource::new())),
        "uzbekistan_direct_purchases" => Some(Box::new(DirectPurchasesSource::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_core::{DateWindow, PageWindow};

    #[test]
    fn every_declared_source_resolves() {
        for name in names() {
            let source = by_name(name).expect("declared source must resolve");
            assert_eq!(source.config().name, name);
        }
    }

    #[test]
    fn completed_deals_issues_two_first_requests() {
        let source = CompletedDealsSource::new();
        let variants = source.variants();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0]["display_on_national"], json!(1));
        assert_eq!(variants[0]["display_on_shop"], json!(0));
        assert_eq!(variants[1]["display_on_national"], json!(0));
        assert_eq!(variants[1]["display_on_shop"], json!(1));
    }

    #[test]
    fn direct_purchase_filters_omit_date_bounds() {
        let source = DirectPurchasesSource::new();
        let filters = source.build_filters(
            PageWindow::new(0, PAGE_SIZE),
            &DateWindow::default(),
            &Map::new(),
        );
        assert_eq!(filters, json!({"from": 0, "to": PAGE_SIZE}));
    }

    #[test]
    fn auction_pages_expand_into_lot_and_product_fetches() {
        let source = AuctionsSource::new();
        let parsed = source
            .parse_page(json!([{"lot_id": 17, "total_count": 1}]))
            .unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(matches!(
            &parsed[0],
            ParsedItem::Detail { descriptor, .. }
                if descriptor.url.ends_with("/GetCompletedDealProducts/17")
        ));
        assert!(matches!(&parsed[1], ParsedItem::Record(_)));
    }
}
