//! Market snapshot repository (spec.md §3, §4.3). One row per
//! (player, waypoint, trade good) — a `Market` read is persisted good by
//! good via upsert so a later snapshot overwrites stale pricing without
//! growing the table unboundedly.

use crate::error::PersistenceError;
use crate::models::{Market, MarketActivity, MarketSupply};
use crate::models::WaypointSymbol;
use chrono::Utc;
use sqlx::Row;

use super::pool::{get_i64, get_opt_str, get_str};
use super::ids::next_id;
use super::Db;

/// `MarketSupply`/`MarketActivity` round-trip through serde (their `Display`
/// impl is a debug-ish helper, not a parser), so the stored column is the
/// JSON-encoded variant string rather than a hand-rolled `FromStr`.
fn supply_to_column(supply: &MarketSupply) -> Result<String, PersistenceError> {
    serde_json::to_value(supply)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| PersistenceError::Query("unrepresentable market supply".to_string()))
}

fn supply_from_column(s: &str) -> Result<MarketSupply, PersistenceError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| PersistenceError::Query(format!("invalid market supply {}", s)))
}

fn activity_to_column(activity: &MarketActivity) -> Result<String, PersistenceError> {
    serde_json::to_value(activity)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| PersistenceError::Query("unrepresentable market activity".to_string()))
}

fn activity_from_column(s: &str) -> Result<MarketActivity, PersistenceError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| PersistenceError::Query(format!("invalid market activity {}", s)))
}

pub async fn save_snapshot(db: &Db, player_id: i64, market: &Market) -> Result<(), PersistenceError> {
    let mut tx = db.pool().begin().await?;
    for good in &market.trade_goods {
        let existing = {
            let select = db.sql(
                "SELECT id FROM market_data WHERE player_id = ? AND waypoint_symbol = ? AND good_symbol = ?",
            );
            sqlx::query(&select)
                .bind(player_id)
                .bind(market.symbol.to_string())
                .bind(&good.symbol)
                .fetch_optional(&mut *tx)
                .await?
        };
        let now = Utc::now().to_rfc3339();
        match existing {
            Some(row) => {
                let id: i64 = row.try_get("id").map_err(|e| PersistenceError::Query(e.to_string()))?;
                let update = db.sql(
                    "UPDATE market_data SET supply = ?, activity = ?, purchase_price = ?, sell_price = ?, trade_volume = ?, last_updated = ?
                     WHERE id = ?",
                );
                sqlx::query(&update)
                    .bind(supply_to_column(&good.supply)?)
                    .bind(good.activity.as_ref().map(activity_to_column).transpose()?)
                    .bind(good.purchase_price)
                    .bind(good.sell_price)
                    .bind(good.trade_volume)
                    .bind(&now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                let id = next_id(&mut tx, db, "market_data").await?;
                let insert = db.sql(
                    "INSERT INTO market_data (id, player_id, waypoint_symbol, good_symbol, supply, activity, purchase_price, sell_price, trade_volume, last_updated)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                );
                sqlx::query(&insert)
                    .bind(id)
                    .bind(player_id)
                    .bind(market.symbol.to_string())
                    .bind(&good.symbol)
                    .bind(supply_to_column(&good.supply)?)
                    .bind(good.activity.as_ref().map(activity_to_column).transpose()?)
                    .bind(good.purchase_price)
                    .bind(good.sell_price)
                    .bind(good.trade_volume)
                    .bind(&now)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }
    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct MarketGoodSnapshot {
    pub waypoint_symbol: WaypointSymbol,
    pub good_symbol: String,
    pub supply: MarketSupply,
    pub activity: Option<MarketActivity>,
    pub purchase_price: i64,
    pub sell_price: i64,
    pub trade_volume: i64,
}

pub async fn find_good(
    db: &Db,
    player_id: i64,
    waypoint_symbol: &WaypointSymbol,
    good_symbol: &str,
) -> Result<Option<MarketGoodSnapshot>, PersistenceError> {
    let select = db.sql(
        "SELECT waypoint_symbol, good_symbol, supply, activity, purchase_price, sell_price, trade_volume
         FROM market_data WHERE player_id = ? AND waypoint_symbol = ? AND good_symbol = ?",
    );
    let row = sqlx::query(&select)
        .bind(player_id)
        .bind(waypoint_symbol.to_string())
        .bind(good_symbol)
        .fetch_optional(db.pool())
        .await?;
    row.map(from_row).transpose()
}

pub async fn list_for_waypoint(
    db: &Db,
    player_id: i64,
    waypoint_symbol: &WaypointSymbol,
) -> Result<Vec<MarketGoodSnapshot>, PersistenceError> {
    let select = db.sql(
        "SELECT waypoint_symbol, good_symbol, supply, activity, purchase_price, sell_price, trade_volume
         FROM market_data WHERE player_id = ? AND waypoint_symbol = ?",
    );
    let rows = sqlx::query(&select)
        .bind(player_id)
        .bind(waypoint_symbol.to_string())
        .fetch_all(db.pool())
        .await?;
    rows.into_iter().map(from_row).collect()
}

fn from_row(row: sqlx::any::AnyRow) -> Result<MarketGoodSnapshot, PersistenceError> {
    let supply_str = get_str(&row, "supply")?;
    let activity_str = get_opt_str(&row, "activity")?;
    Ok(MarketGoodSnapshot {
        waypoint_symbol: WaypointSymbol::new(&get_str(&row, "waypoint_symbol")?),
        good_symbol: get_str(&row, "good_symbol")?,
        supply: supply_from_column(&supply_str)?,
        activity: activity_str.map(|s| activity_from_column(&s)).transpose()?,
        purchase_price: get_i64(&row, "purchase_price")?,
        sell_price: get_i64(&row, "sell_price")?,
        trade_volume: get_i64(&row, "trade_volume")?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::{MarketTradeGood, MarketType};

    fn sample_market() -> Market {
        Market {
            symbol: WaypointSymbol::new("X1-TZ26-A1"),
            transactions: vec![],
            imports: vec![],
            exports: vec![],
            exchange: vec![],
            trade_goods: vec![MarketTradeGood {
                symbol: "FUEL".to_string(),
                trade_volume: 180,
                _type: MarketType::Exchange,
                supply: MarketSupply::Moderate,
                activity: None,
                purchase_price: 72,
                sell_price: 68,
            }],
        }
    }

    #[tokio::test]
    async fn save_then_find_round_trips() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        save_snapshot(&db, 1, &sample_market()).await.unwrap();
        let found = find_good(&db, 1, &WaypointSymbol::new("X1-TZ26-A1"), "FUEL")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.purchase_price, 72);
    }

    #[tokio::test]
    async fn resaving_overwrites_rather_than_duplicates() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        save_snapshot(&db, 1, &sample_market()).await.unwrap();
        let mut updated = sample_market();
        updated.trade_goods[0].purchase_price = 99;
        save_snapshot(&db, 1, &updated).await.unwrap();

        let goods = list_for_waypoint(&db, 1, &WaypointSymbol::new("X1-TZ26-A1")).await.unwrap();
        assert_eq!(goods.len(), 1);
        assert_eq!(goods[0].purchase_price, 99);
    }
}
