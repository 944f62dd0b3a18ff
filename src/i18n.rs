use std::env;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn from_str(s: &str) -> Self {
        let s = s.to_lowercase();
        if s.starts_with("zh") {
            Language::Zh
        } else {
            Language::En
        }
    }

    /// Configured preference first, then the `LANG` environment variable.
    pub fn detect(preference: Option<&str>) -> Self {
        if let Some(lang) = preference {
            return Self::from_str(lang);
        }
        env::var("LANG")
            .map(|lang| Self::from_str(&lang))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MessageKey {
    Banner,
    StartHint,
    BannerCommandsHint,
    RetryHint,
    CommandsHeader,
    CommandQuit,
    CommandClear,
    CommandReset,
    CommandHistory,
    CommandHelp,
    CommandAsk,
    PromptUser,
    PromptAssistant,
    Goodbye,
    InvalidInput,
    CleanedInput,
    ResetDone,
    HistoryEmpty,
    HistoryHeader,
    HistoryTotal,
    CurrentTurns,
    UsageTokens,
    UsagePrompt,
    UsageCompletion,
    UsageTurns,
    ChatFailed,
    ChatFailedHint,
    InputFailed,
    UsingProvider,
    UsingBaseUrl,
    UsingModel,
    ConfigFailed,
    ConfigHint,
    AvailableProviders,
    KeyPresent,
    KeyAbsent,
}

pub fn t(lang: &Language, key: MessageKey) -> &'static str {
    match (lang, key) {
        // Interactive banner
        (Language::En, MessageKey::Banner) => "🤖 AI Chat - interactive mode (conversation context kept)",
        (Language::Zh, MessageKey::Banner) => "🤖 AI Chat - 交互模式 (支持上下文记忆)",

        (Language::En, MessageKey::StartHint) => "💡 Type a question to start",
        (Language::Zh, MessageKey::StartHint) => "💡 输入问题开始对话",

        (Language::En, MessageKey::BannerCommandsHint) => {
            "💡 Type a question to start, or 'help' for commands"
        }
        (Language::Zh, MessageKey::BannerCommandsHint) => "💡 输入问题开始对话，输入 'help' 查看命令",

        (Language::En, MessageKey::RetryHint) => "💡 If input looks wrong, press Enter and type it again",
        (Language::Zh, MessageKey::RetryHint) => "💡 如果输入出现问题，直接按回车重新输入",

        // Command summary
        (Language::En, MessageKey::CommandsHeader) => "💡 Commands:",
        (Language::Zh, MessageKey::CommandsHeader) => "💡 可用命令:",

        (Language::En, MessageKey::CommandQuit) => "   • quit/exit - leave the program",
        (Language::Zh, MessageKey::CommandQuit) => "   • quit/exit - 退出程序",

        (Language::En, MessageKey::CommandClear) => "   • clear - clear the screen",
        (Language::Zh, MessageKey::CommandClear) => "   • clear - 清屏",

        (Language::En, MessageKey::CommandReset) => "   • reset - forget the conversation",
        (Language::Zh, MessageKey::CommandReset) => "   • reset - 重置对话历史",

        (Language::En, MessageKey::CommandHistory) => "   • history - show the conversation",
        (Language::Zh, MessageKey::CommandHistory) => "   • history - 显示对话历史",

        (Language::En, MessageKey::CommandHelp) => "   • help - show this help",
        (Language::Zh, MessageKey::CommandHelp) => "   • help - 显示此帮助",

        (Language::En, MessageKey::CommandAsk) => "   • anything else is sent as a question",
        (Language::Zh, MessageKey::CommandAsk) => "   • 直接输入问题开始对话",

        // Prompts
        (Language::En, MessageKey::PromptUser) => "you> ",
        (Language::Zh, MessageKey::PromptUser) => "你> ",

        (Language::En, MessageKey::PromptAssistant) => "assistant> ",
        (Language::Zh, MessageKey::PromptAssistant) => "助手> ",

        // Session feedback
        (Language::En, MessageKey::Goodbye) => "👋 Bye!",
        (Language::Zh, MessageKey::Goodbye) => "👋 再见！",

        (Language::En, MessageKey::InvalidInput) => "⚠️  Input contained only invalid characters, please try again",
        (Language::Zh, MessageKey::InvalidInput) => "⚠️  输入包含无效字符，请重新输入",

        (Language::En, MessageKey::CleanedInput) => "📝 Cleaned input: ",
        (Language::Zh, MessageKey::CleanedInput) => "📝 已清理输入: ",

        (Language::En, MessageKey::ResetDone) => "🔄 Conversation history reset",
        (Language::Zh, MessageKey::ResetDone) => "🔄 对话历史已重置",

        (Language::En, MessageKey::HistoryEmpty) => "📝 No conversation yet",
        (Language::Zh, MessageKey::HistoryEmpty) => "📝 暂无对话历史",

        (Language::En, MessageKey::HistoryHeader) => "📝 Conversation:",
        (Language::Zh, MessageKey::HistoryHeader) => "📝 对话历史:",

        (Language::En, MessageKey::HistoryTotal) => "📊 Total turns: ",
        (Language::Zh, MessageKey::HistoryTotal) => "📊 总计对话轮次: ",

        (Language::En, MessageKey::CurrentTurns) => "💡 Turns so far: ",
        (Language::Zh, MessageKey::CurrentTurns) => "💡 当前对话轮次: ",

        // Usage line pieces
        (Language::En, MessageKey::UsageTokens) => "📊 Tokens: ",
        (Language::Zh, MessageKey::UsageTokens) => "📊 Token使用: ",

        (Language::En, MessageKey::UsagePrompt) => "prompt: ",
        (Language::Zh, MessageKey::UsagePrompt) => "输入: ",

        (Language::En, MessageKey::UsageCompletion) => "completion: ",
        (Language::Zh, MessageKey::UsageCompletion) => "输出: ",

        (Language::En, MessageKey::UsageTurns) => "turns: ",
        (Language::Zh, MessageKey::UsageTurns) => "对话轮次: ",

        // Errors
        (Language::En, MessageKey::ChatFailed) => "❌ Chat failed: ",
        (Language::Zh, MessageKey::ChatFailed) => "❌ 对话失败: ",

        (Language::En, MessageKey::ChatFailedHint) => {
            "💡 Check your network connection or try again; type 'help' for commands"
        }
        (Language::Zh, MessageKey::ChatFailedHint) => "💡 请检查网络连接或重试，输入 'help' 查看可用命令",

        (Language::En, MessageKey::InputFailed) => "❌ Input error: ",
        (Language::Zh, MessageKey::InputFailed) => "❌ 输入错误: ",

        // Startup
        (Language::En, MessageKey::UsingProvider) => "🚀 Provider: ",
        (Language::Zh, MessageKey::UsingProvider) => "🚀 使用提供商: ",

        (Language::En, MessageKey::UsingBaseUrl) => "🌐 API URL: ",
        (Language::Zh, MessageKey::UsingBaseUrl) => "🌐 API地址: ",

        (Language::En, MessageKey::UsingModel) => "🤖 Model: ",
        (Language::Zh, MessageKey::UsingModel) => "🤖 使用模型: ",

        (Language::En, MessageKey::ConfigFailed) => "❌ Configuration error: ",
        (Language::Zh, MessageKey::ConfigFailed) => "❌ 配置错误: ",

        (Language::En, MessageKey::AvailableProviders) => "📋 Configured providers:",
        (Language::Zh, MessageKey::AvailableProviders) => "📋 可用的提供商:",

        (Language::En, MessageKey::KeyPresent) => "key set",
        (Language::Zh, MessageKey::KeyPresent) => "已设置密钥",

        (Language::En, MessageKey::KeyAbsent) => "no key",
        (Language::Zh, MessageKey::KeyAbsent) => "未设置密钥",

        (Language::En, MessageKey::ConfigHint) => {
            "💡 Run 'ai-chat config init' to create a config file, then 'ai-chat config show' to check it"
        }
        (Language::Zh, MessageKey::ConfigHint) => {
            "💡 请先运行 'ai-chat config init' 初始化配置，再用 'ai-chat config show' 检查"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_str() {
        assert!(matches!(Language::from_str("zh-CN"), Language::Zh));
        assert!(matches!(Language::from_str("zh_CN.UTF-8"), Language::Zh));
        assert!(matches!(Language::from_str("ZH"), Language::Zh));
        assert!(matches!(Language::from_str("en-US"), Language::En));
        assert!(matches!(Language::from_str("C"), Language::En));
        assert!(matches!(Language::from_str("unknown"), Language::En));
    }

    #[test]
    fn test_detect_prefers_configured_language() {
        assert_eq!(Language::detect(Some("zh")), Language::Zh);
        assert_eq!(Language::detect(Some("en")), Language::En);
    }

    #[test]
    fn test_translation() {
        assert_eq!(t(&Language::En, MessageKey::PromptUser), "you> ");
        assert_eq!(t(&Language::Zh, MessageKey::PromptUser), "你> ");
        assert_eq!(t(&Language::Zh, MessageKey::ResetDone), "🔄 对话历史已重置");
    }
}
