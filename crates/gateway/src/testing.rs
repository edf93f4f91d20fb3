//! 路由测试用的内存后端：行为与真实游戏/校验服务一致，带调用计数与故障注入

use crate::backend::{GameBackend, Upstream};
use async_trait::async_trait;
use bingo_common::models::{
    BingoReply, CardReply, CreateGameReply, DrawNumberReply, RegisterPlayerReply, SuccessReply,
};
use bingo_common::{BackendMode, GatewayError, Outcome};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const MAX_NUMBER: i32 = 75;

#[derive(Debug, Clone)]
pub enum Fault {
    Unavailable,
    Timeout,
    Application(String),
}

#[derive(Debug, Default)]
struct Player {
    game_id: String,
    card: Vec<i32>,
    marked: HashSet<i32>,
}

#[derive(Debug, Default)]
struct Store {
    games: HashMap<String, Vec<i32>>,
    players: HashMap<String, Player>,
}

pub struct FakeBackend {
    mode: BackendMode,
    calls: AtomicUsize,
    fault: Mutex<Option<Fault>>,
    store: Mutex<Store>,
    down: Mutex<HashSet<Upstream>>,
    hanging: Mutex<HashSet<Upstream>>,
}

impl FakeBackend {
    pub fn new(mode: BackendMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            fault: Mutex::new(None),
            store: Mutex::new(Store::default()),
            down: Mutex::new(HashSet::new()),
            hanging: Mutex::new(HashSet::new()),
        }
    }

    /// 不含健康探测
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inject(&self, fault: Fault) {
        *self.fault.lock().unwrap() = Some(fault);
    }

    pub fn set_down(&self, upstream: Upstream) {
        self.down.lock().unwrap().insert(upstream);
    }

    pub fn set_hanging(&self, upstream: Upstream) {
        self.hanging.lock().unwrap().insert(upstream);
    }

    fn enter(&self) -> Outcome<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fault.lock().unwrap().clone() {
            None => Ok(()),
            Some(Fault::Unavailable) => Err(GatewayError::unavailable("connection refused")),
            Some(Fault::Timeout) => Err(GatewayError::Timeout),
            Some(Fault::Application(msg)) => Err(GatewayError::upstream(msg)),
        }
    }
}

#[async_trait]
impl GameBackend for FakeBackend {
    fn mode(&self) -> BackendMode {
        self.mode
    }

    async fn create_game(&self, _game_name: &str) -> Outcome<CreateGameReply> {
        self.enter()?;
        let mut store = self.store.lock().unwrap();
        let game_id = format!("g{}", store.games.len() + 1);
        store.games.insert(game_id.clone(), Vec::new());
        Ok(CreateGameReply { game_id })
    }

    async fn register_player(
        &self,
        game_id: &str,
        _player_name: &str,
    ) -> Outcome<RegisterPlayerReply> {
        self.enter()?;
        let mut store = self.store.lock().unwrap();
        if !store.games.contains_key(game_id) {
            return Ok(RegisterPlayerReply {
                player_id: String::new(),
                card: Vec::new(),
                success: false,
            });
        }
        let n = store.players.len() as i32 + 1;
        let player_id = format!("p{n}");
        let card: Vec<i32> = ((n - 1) * 5 + 1..=(n - 1) * 5 + 5).collect();
        store.players.insert(
            player_id.clone(),
            Player {
                game_id: game_id.to_string(),
                card: card.clone(),
                marked: HashSet::new(),
            },
        );
        Ok(RegisterPlayerReply {
            player_id,
            card,
            success: true,
        })
    }

    async fn draw_number(&self, game_id: &str) -> Outcome<DrawNumberReply> {
        self.enter()?;
        let mut store = self.store.lock().unwrap();
        match store.games.get_mut(game_id) {
            Some(drawn) if (drawn.len() as i32) < MAX_NUMBER => {
                let number = drawn.len() as i32 + 1;
                drawn.push(number);
                Ok(DrawNumberReply {
                    number,
                    success: true,
                })
            }
            _ => Ok(DrawNumberReply {
                number: 0,
                success: false,
            }),
        }
    }

    async fn mark_number(
        &self,
        game_id: Option<&str>,
        player_id: &str,
        number: i32,
    ) -> Outcome<SuccessReply> {
        self.enter()?;
        let mut store = self.store.lock().unwrap();
        let success = match store.players.get_mut(player_id) {
            Some(player) if game_id.is_none_or(|id| id == player.game_id) => {
                let on_card = player.card.contains(&number);
                if on_card {
                    player.marked.insert(number);
                }
                on_card
            }
            _ => false,
        };
        Ok(SuccessReply { success })
    }

    async fn check_bingo(&self, game_id: &str, player_id: &str) -> Outcome<BingoReply> {
        self.enter()?;
        let store = self.store.lock().unwrap();
        let bingo = store.players.get(player_id).is_some_and(|player| {
            player.game_id == game_id
                && !player.card.is_empty()
                && player.card.iter().all(|n| player.marked.contains(n))
        });
        Ok(BingoReply { bingo })
    }

    async fn get_card(&self, player_id: &str) -> Outcome<CardReply> {
        self.enter()?;
        let store = self.store.lock().unwrap();
        store
            .players
            .get(player_id)
            .map(|player| CardReply {
                card: player.card.clone(),
            })
            .ok_or_else(|| GatewayError::upstream("Jogador não encontrado"))
    }

    async fn register_card(&self, player_id: &str, card_numbers: &[i32]) -> Outcome<SuccessReply> {
        self.enter()?;
        let mut store = self.store.lock().unwrap();
        let player = store.players.entry(player_id.to_string()).or_default();
        player.card = card_numbers.to_vec();
        player.marked.clear();
        Ok(SuccessReply { success: true })
    }

    async fn validate_number(&self, player_id: &str, number: i32) -> Outcome<SuccessReply> {
        self.enter()?;
        let store = self.store.lock().unwrap();
        let success = store
            .players
            .get(player_id)
            .is_some_and(|player| player.card.contains(&number));
        Ok(SuccessReply { success })
    }

    async fn validate_bingo(&self, player_id: &str, numbers: &[i32]) -> Outcome<BingoReply> {
        self.enter()?;
        let store = self.store.lock().unwrap();
        let bingo = store.players.get(player_id).is_some_and(|player| {
            !player.card.is_empty() && player.card.iter().all(|n| numbers.contains(n))
        });
        Ok(BingoReply { bingo })
    }

    async fn probe(&self, upstream: Upstream) -> Outcome<String> {
        let hanging = self.hanging.lock().unwrap().contains(&upstream);
        if hanging {
            std::future::pending::<()>().await;
        }
        if self.down.lock().unwrap().contains(&upstream) {
            return Err(GatewayError::unavailable("connection refused"));
        }
        Ok("ok".to_string())
    }
}
