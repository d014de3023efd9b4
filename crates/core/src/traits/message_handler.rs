use crate::models::CompensateCommand;

/// 补偿命令处理接口
pub trait MessageHandler: Send + Sync {
    fn on_receive(&self, command: CompensateCommand);
}

impl<F> MessageHandler for F
where
    F: Fn(CompensateCommand) + Send + Sync,
{
    fn on_receive(&self, command: CompensateCommand) {
        self(command)
    }
}
