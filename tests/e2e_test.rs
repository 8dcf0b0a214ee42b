use chrono::{Days, Utc};
use emabot::api::AlpacaClient;
use emabot::indicators::{ema_from_bars, required_closes, window_start};
use emabot::strategy::decide;
use emabot::*;

const PAPER_URL: &str = "https://paper-api.alpaca.markets";
const DATA_URL: &str = "https://data.alpaca.markets";

fn paper_client() -> AlpacaClient {
    dotenvy::dotenv().ok();
    let key = std::env::var("ALPACA_API_KEY").expect("ALPACA_API_KEY must be set");
    let secret = std::env::var("ALPACA_SECRET_KEY").expect("ALPACA_SECRET_KEY must be set");
    AlpacaClient::new(&key, &secret, PAPER_URL, DATA_URL, "iex").unwrap()
}

#[tokio::test]
#[ignore] // Requires Alpaca paper credentials
async fn test_e2e_read_only_cycle() {
    let _ = tracing_subscriber::fmt::try_init();
    let client = paper_client();

    println!("=== Starting E2E Test ===\n");

    // 1. Account state
    println!("1. Reading paper account...");
    let snapshot = client.snapshot().await.unwrap();
    println!("   ✓ Cash available: ${}", snapshot.cash_available);
    println!("   ✓ Open positions: {}", snapshot.positions.len());

    // 2. Latest quote
    println!("\n2. Fetching TQQQ quote...");
    let quote = client.latest_quote("TQQQ").await.unwrap();
    println!("   ✓ Ask: ${}", quote.ask_price);

    // 3. Calendar + bars
    println!("\n3. Fetching trading calendar and daily bars...");
    let today = Utc::now().date_naive();
    let needed = required_closes(50);
    let calendar = client
        .trading_days(today - Days::new(2 * needed as u64), today)
        .await
        .unwrap();
    let start = window_start(&calendar, needed).unwrap();
    let bars = client.daily_bars("TQQQ", start).await.unwrap();
    println!("   ✓ {} bars since {}", bars.len(), start);
    assert!(bars.len() >= needed, "cycle needs {} bars", needed);

    // 4. Decision, without trading
    let ema = ema_from_bars(&bars, 50).unwrap();
    let signal = decide(ema, quote.ask_price, snapshot.in_cash());
    println!("\n4. EMA(50) = {:.4}, signal = {:?}", ema, signal);
    assert!(ema > rust_decimal::Decimal::ZERO);

    // 5. Clock
    let clock = client.clock().await.unwrap();
    println!("\n5. Market open: {}, next close: {}", clock.is_open, clock.next_close);
    assert!(clock.next_close > clock.timestamp);

    println!("\n=== E2E Test Complete ✅ ===");
}
