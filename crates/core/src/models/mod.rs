//! # 数据模型
//!
//! 定义Omega与Alpha之间交换的核心数据结构。
//!
//! ## 核心模型
//!
//! ### TxEvent - 事务事件
//! 参与方在Saga生命周期中产生的事件（开始、成功、失败、补偿），由连接器发送给任一Alpha节点。
//!
//! ### AlphaResponse - Alpha应答
//! Alpha处理事件后的应答。`aborted` 为 true 表示全局事务已中止，但这仍然是一次成功的发送。
//!
//! ### CompensateCommand - 补偿命令
//! Alpha下发给参与方的补偿指令，交由 [`crate::traits::MessageHandler`] 处理。
//!
//! ### ServiceConfig - 服务标识
//! 参与方在连接/断开时向Alpha声明的身份。
//!
//! 连接器本身不解析事件的业务字段，只负责投递并区分传输故障与应用层拒绝。

pub mod command;
pub mod event;
pub mod service;

pub use command::*;
pub use event::*;
pub use service::*;
