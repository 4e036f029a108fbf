use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::catalog::ActionCatalog;
use crate::config::AgentType;
use crate::types::{ActionResponse, Turn};

const SYSTEM_PROMPT: &str = "You are a helpful assistant. You are playing Crafter, a 2-d grid-world \
game. Your final goal is to survive and collect the diamond, but to achieve that, at every step, \
your task is to select the best action towards the final goal based on the current game state. \
The game state has been translated into a grid of text for your convenience. Please provide your \
answer in JSON format.";

/// Game state the prompt is built from
#[derive(Debug, Clone, Copy)]
pub struct GameSnapshot<'a> {
    pub text_grid: &'a [Vec<String>],
    pub inventory: &'a BTreeMap<String, i64>,
    /// Most recent accepted responses, oldest first.
    pub recent_actions: &'a [ActionResponse],
    pub total_reward: f64,
}

/// Builds the per-step conversation for the action selector
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    agent_type: AgentType,
    map_size: u32,
}

impl PromptBuilder {
    pub fn new(agent_type: AgentType, map_size: u32) -> Self {
        Self {
            agent_type,
            map_size,
        }
    }

    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    /// System rules, game description, then the task with state, catalog and schema.
    pub fn build(&self, catalog: &ActionCatalog, snapshot: &GameSnapshot<'_>) -> Vec<Turn> {
        vec![
            Turn::system(SYSTEM_PROMPT),
            Turn::user(self.game_info()),
            Turn::user(self.task(catalog, snapshot)),
        ]
    }

    fn game_info(&self) -> String {
        format!(
            "The game Crafter is a 2-d grid-world game where you play as a character who can move \
around, mine resources, craft tools, and place objects. The game world is a grid of size {size}x{size}, \
but the player can only observe their surroundings of size 9x7. The game state is represented by a \
grid of text where each cell contains information about the material at that location. The game \
state also provides the player's inventory, which includes the player's health, food, drink and \
energy levels, as well as the tools and resources they have collected. When the food, drink, or \
energy level reaches zero, the player loses health, so these need to be replenished to stay alive. \
Tools follow a tech-tree: lower-tier tools must be crafted before higher-tier ones.",
            size = self.map_size
        )
    }

    fn task(&self, catalog: &ActionCatalog, snapshot: &GameSnapshot<'_>) -> String {
        let (history_label, instructions) = match self.agent_type {
            AgentType::Plain => (
                "Previous actions",
                "Your task is to propose the best action to execute at the next step based on the \
current observation and status.",
            ),
            AgentType::Cot => (
                "Previous actions and rationale",
                "Your task is to:\n\
- propose the top 3 actions to execute at the next step based on the current observation and status.\n\
- give the rationale for each proposed action.\n\
- predict the consequences of executing each proposed action.\n\
- based on the consequences, select the best action to execute next.\n\
- justify your choice.",
            ),
        };

        let schema = serde_json::to_string_pretty(&self.output_schema()).unwrap_or_default();

        format!(
            "Given the following information describing the current game state:\n\
- Current observation:\n    {observation}\n\
- Current status:\n    {status}\n\
- {history_label}:\n    {history}\n\
- Rewards received so far:\n    {reward}\n\n\
{instructions}\n\n\
Note: You can only select actions from the available actions: {catalog}.\n\
Note: Avoid unnecessary crafting and placement if the items are within reachable distance.\n\
Note: Craft as many different tools as early as possible to increase the chance of reaching the final goal.\n\n\
Please format your response in the following format:\n{schema}\n",
            observation = Value::from(snapshot.text_grid.to_vec()),
            status = json!(snapshot.inventory),
            history = json!(snapshot.recent_actions),
            reward = snapshot.total_reward,
            catalog = catalog.to_json(),
        )
    }

    /// Template the model is asked to fill in.
    pub fn output_schema(&self) -> Value {
        match self.agent_type {
            AgentType::Plain => json!({
                "chosen_action": "the action you choose to execute",
            }),
            AgentType::Cot => json!({
                "top_3_actions_proposal": {
                    "action_1": "the action you propose",
                    "action_2": "the action you propose",
                    "action_3": "the action you propose",
                },
                "top_3_actions_rationale": {
                    "action_1": "why you propose this action",
                    "action_2": "why you propose this action",
                    "action_3": "why you propose this action",
                },
                "top_3_actions_consequences": {
                    "action_1": "what will happen if you execute this action",
                    "action_2": "what will happen if you execute this action",
                    "action_3": "what will happen if you execute this action",
                },
                "chosen_action": "the action you choose to execute",
                "justification": "the reason why you choose this action from the top 3 actions",
            }),
        }
    }
}
