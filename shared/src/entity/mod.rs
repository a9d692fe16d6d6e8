pub mod price_bars;
