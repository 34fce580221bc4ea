pub mod game_data;
pub mod game_id;
pub mod pgn;
